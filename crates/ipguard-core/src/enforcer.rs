//! Limit evaluation and the enforcement cycle.
//!
//! [`EnforcementContext`] owns the cycle-to-cycle streak table and runs
//! one full pass: reduce the session snapshot, fold it into the streak
//! table, report to the admins, and disable every non-exempt user whose
//! distinct active-IP count exceeds their effective limit.

use crate::config::{BotConfig, ConfigStore};
use crate::panel::Disabler;
use crate::report;
use crate::snapshot::{self, SnapshotStore};
use crate::streaks::StreakTable;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// The seam through which cycle reports and warnings reach the admins.
///
/// Implementations must isolate delivery failures per recipient and
/// never propagate them into the cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one text blob to every configured admin.
    async fn send(&self, text: &str);
}

/// A user whose active-IP count exceeded their effective limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The over-limit user.
    pub user: String,
    /// Distinct IPs active for the user this cycle.
    pub active_ips: Vec<String>,
    /// The limit that was exceeded.
    pub limit: u64,
}

/// State and collaborators of the enforcement cycle.
///
/// Owns the streak table explicitly instead of hiding it in globals, so
/// tests can drive cycles against injected collaborators.
pub struct EnforcementContext {
    config: Arc<ConfigStore>,
    snapshot: Arc<SnapshotStore>,
    streaks: Mutex<StreakTable>,
    disabler: Arc<dyn Disabler>,
    notifier: Arc<dyn Notifier>,
}

impl EnforcementContext {
    /// Create a context around the shared stores and collaborators.
    pub fn new(
        config: Arc<ConfigStore>,
        snapshot: Arc<SnapshotStore>,
        disabler: Arc<dyn Disabler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            snapshot,
            streaks: Mutex::new(StreakTable::new()),
            disabler,
            notifier,
        }
    }

    /// Run one full enforcement cycle.
    ///
    /// A config-load failure skips the cycle (logged, retried on the
    /// next tick); a disable failure is logged and the remaining users
    /// are still processed. The streak table is deliberately kept
    /// across cycles; the snapshot is drained so the next polling
    /// window starts empty.
    pub async fn run_cycle(&self) {
        let cfg = match self.config.load().await {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Skipping enforcement cycle, config unavailable: {e}");
                return;
            }
        };

        let raw = self.snapshot.drain().await;
        let current_active = snapshot::reduce(&raw);

        let violations = {
            let mut table = self.streaks.lock().await;
            for event in table.apply(&current_active) {
                debug!("Streak transition: {event:?}");
            }

            let mut messages = report::format_streak_blocks(&table);
            messages.push(report::summary_line(table.total_ips()));
            for chunk in report::chunk_blocks(&messages, report::REPORT_CHUNK_SIZE) {
                self.notifier.send(&chunk).await;
            }

            find_violations(&cfg, &table)
        };

        for violation in violations {
            let message = format!(
                "User {} has {} active ips. {:?}",
                violation.user,
                violation.active_ips.len(),
                violation.active_ips
            );
            warn!("{message}");
            self.notifier
                .send(&format!("<b>Warning: </b>{message}"))
                .await;
            if let Err(e) = self.disabler.disable_user(&violation.user).await {
                error!("Failed to disable {}: {e}", violation.user);
            }
        }
    }

    /// Current enforcement interval, reloaded from config.
    pub async fn check_interval(&self) -> Duration {
        match self.config.load().await {
            Ok(cfg) => Duration::from_secs(cfg.check_interval_secs),
            Err(e) => {
                warn!("Config unavailable, keeping default interval: {e}");
                Duration::from_secs(crate::config::DEFAULT_CHECK_INTERVAL_SECS)
            }
        }
    }

    /// Copy of the current streak counts, for inspection.
    pub async fn streak_counts(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let table = self.streaks.lock().await;
        table
            .iter()
            .map(|(user, ips)| (user.clone(), ips.clone()))
            .collect()
    }
}

/// Flag every non-exempt user whose distinct active-IP count exceeds
/// their effective limit (per-user override, else the general limit).
///
/// With no general limit configured, users without an override are
/// skipped; this is logged once per call.
#[must_use]
pub fn find_violations(cfg: &BotConfig, table: &StreakTable) -> Vec<Violation> {
    let except: HashSet<&str> = cfg.except_users.iter().map(String::as_str).collect();
    let mut skipped_without_limit = false;
    let mut violations = Vec::new();

    for (user, ip_map) in table.iter() {
        if except.contains(user.as_str()) {
            continue;
        }
        let Some(limit) = cfg.special_limit.get(user).copied().or(cfg.general_limit) else {
            skipped_without_limit = true;
            continue;
        };
        let active = ip_map.len() as u64;
        if active > limit {
            violations.push(Violation {
                user: user.clone(),
                active_ips: ip_map.keys().cloned().collect(),
                limit,
            });
        }
    }

    if skipped_without_limit {
        warn!("GENERAL_LIMIT is not configured; users without a special limit were skipped");
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{MockDisabler, PanelError};
    use std::collections::HashMap;

    fn table_with(entries: &[(&str, &[&str])]) -> StreakTable {
        let mut table = StreakTable::new();
        let cycle: HashMap<String, Vec<String>> = entries
            .iter()
            .map(|(user, ips)| {
                (
                    (*user).to_string(),
                    ips.iter().map(ToString::to_string).collect(),
                )
            })
            .collect();
        table.apply(&cycle);
        table
    }

    fn config_with_limits() -> BotConfig {
        BotConfig {
            bot_token: "123:abc".to_string(),
            general_limit: Some(3),
            special_limit: HashMap::from([("alice".to_string(), 5)]),
            except_users: vec!["vip".to_string()],
            ..BotConfig::default()
        }
    }

    #[test]
    fn special_limit_overrides_general() {
        let table = table_with(&[
            ("alice", &["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]),
            ("bob", &["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]),
        ]);
        let violations = find_violations(&config_with_limits(), &table);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].user, "bob");
        assert_eq!(violations[0].limit, 3);
        assert_eq!(violations[0].active_ips.len(), 4);
    }

    #[test]
    fn limit_is_strictly_greater_than() {
        let table = table_with(&[("bob", &["1.1.1.1", "2.2.2.2", "3.3.3.3"])]);
        assert!(find_violations(&config_with_limits(), &table).is_empty());
    }

    #[test]
    fn exempt_users_are_never_flagged() {
        let table = table_with(&[(
            "vip",
            &["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4", "5.5.5.5"],
        )]);
        assert!(find_violations(&config_with_limits(), &table).is_empty());
    }

    #[test]
    fn missing_general_limit_skips_users_without_override() {
        let table = table_with(&[
            ("alice", &["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4", "5.5.5.5", "6.6.6.6"]),
            ("bob", &["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]),
        ]);
        let cfg = BotConfig {
            general_limit: None,
            ..config_with_limits()
        };
        let violations = find_violations(&cfg, &table);
        // alice still has her override; bob is skipped.
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].user, "alice");
    }

    #[tokio::test]
    async fn disable_failure_does_not_stop_the_cycle() {
        let mut disabler = MockDisabler::new();
        disabler
            .expect_disable_user()
            .withf(|user| user == "bob")
            .times(1)
            .returning(|_| {
                Err(PanelError::Api {
                    status: 500,
                    body: "boom".to_string(),
                })
            });
        disabler
            .expect_disable_user()
            .withf(|user| user == "carol")
            .times(1)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_| ());

        let store = {
            let path = std::env::temp_dir().join(format!(
                "ipguard-enforcer-test-{}.json",
                std::process::id()
            ));
            Arc::new(ConfigStore::new(path))
        };
        store
            .save(&BotConfig {
                general_limit: Some(1),
                ..config_with_limits()
            })
            .await
            .expect("save config");

        let snapshot = Arc::new(SnapshotStore::new());
        snapshot
            .record("bob", ["1.1.1.1".to_string(), "2.2.2.2".to_string()])
            .await;
        snapshot
            .record("carol", ["3.3.3.3".to_string(), "4.4.4.4".to_string()])
            .await;

        let ctx = EnforcementContext::new(
            store,
            snapshot.clone(),
            Arc::new(disabler),
            Arc::new(notifier),
        );
        ctx.run_cycle().await;

        // Both users were processed despite bob's disable failing.
        assert!(snapshot.is_empty().await);
        assert_eq!(ctx.streak_counts().await.len(), 2);
    }
}
