//! End-to-end behavior of the enforcement cycle against fake
//! collaborators: streak lifecycle across cycles, limit evaluation,
//! exemption, and loop cancellation.

use async_trait::async_trait;
use ipguard_core::config::{BotConfig, ConfigStore};
use ipguard_core::enforcer::{EnforcementContext, Notifier};
use ipguard_core::panel::{Disabler, PanelError};
use ipguard_core::scheduler::run_enforcement_loop;
use ipguard_core::snapshot::SnapshotStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.messages.lock().await.push(text.to_string());
    }
}

#[derive(Default)]
struct RecordingDisabler {
    disabled: Mutex<Vec<String>>,
    fail_for: Option<String>,
}

#[async_trait]
impl Disabler for RecordingDisabler {
    async fn disable_user(&self, username: &str) -> Result<(), PanelError> {
        self.disabled.lock().await.push(username.to_string());
        if self.fail_for.as_deref() == Some(username) {
            return Err(PanelError::Api {
                status: 500,
                body: "panel unavailable".to_string(),
            });
        }
        Ok(())
    }
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

async fn store_with(cfg: &BotConfig) -> Arc<ConfigStore> {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "ipguard-cycle-test-{}-{n}.json",
        std::process::id()
    ));
    let store = Arc::new(ConfigStore::new(path));
    store.save(cfg).await.expect("save config");
    store
}

fn base_config() -> BotConfig {
    BotConfig {
        bot_token: "123:abc".to_string(),
        general_limit: Some(3),
        special_limit: HashMap::from([("alice".to_string(), 5)]),
        except_users: vec!["vip".to_string()],
        check_interval_secs: 3600,
        ..BotConfig::default()
    }
}

struct Harness {
    ctx: Arc<EnforcementContext>,
    snapshot: Arc<SnapshotStore>,
    notifier: Arc<RecordingNotifier>,
    disabler: Arc<RecordingDisabler>,
}

async fn harness(cfg: &BotConfig, fail_for: Option<&str>) -> Harness {
    let store = store_with(cfg).await;
    let snapshot = Arc::new(SnapshotStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let disabler = Arc::new(RecordingDisabler {
        disabled: Mutex::new(Vec::new()),
        fail_for: fail_for.map(ToString::to_string),
    });
    let ctx = Arc::new(EnforcementContext::new(
        store,
        snapshot.clone(),
        disabler.clone(),
        notifier.clone(),
    ));
    Harness {
        ctx,
        snapshot,
        notifier,
        disabler,
    }
}

async fn record(snapshot: &SnapshotStore, user: &str, ips: &[&str]) {
    snapshot
        .record(user, ips.iter().map(ToString::to_string))
        .await;
}

#[tokio::test]
async fn streaks_accumulate_and_reset_across_cycles() {
    let h = harness(&base_config(), None).await;

    // Cycles 1..3: the IP is continuously active.
    for expected in 1..=3u64 {
        record(&h.snapshot, "alice", &["1.1.1.1"]).await;
        h.ctx.run_cycle().await;
        let counts = h.ctx.streak_counts().await;
        assert_eq!(counts["alice"]["1.1.1.1"], expected);
    }

    // Cycle 4: the IP is absent; the user stays active on another one.
    record(&h.snapshot, "alice", &["2.2.2.2"]).await;
    h.ctx.run_cycle().await;
    let counts = h.ctx.streak_counts().await;
    assert!(!counts["alice"].contains_key("1.1.1.1"));
    assert_eq!(counts["alice"]["2.2.2.2"], 1);

    // Cycle 5: the user disappears entirely.
    h.ctx.run_cycle().await;
    assert!(h.ctx.streak_counts().await.is_empty());
}

#[tokio::test]
async fn over_limit_users_are_warned_and_disabled() {
    let h = harness(&base_config(), None).await;

    // alice has a special limit of 5, so 4 IPs is fine; bob gets the
    // general limit of 3 and is over it; vip is exempt.
    record(&h.snapshot, "alice", &["1.1.1.1", "1.1.1.2", "1.1.1.3", "1.1.1.4"]).await;
    record(&h.snapshot, "bob", &["2.2.2.1", "2.2.2.2", "2.2.2.3", "2.2.2.4"]).await;
    record(&h.snapshot, "vip", &["3.3.3.1", "3.3.3.2", "3.3.3.3", "3.3.3.4"]).await;
    h.ctx.run_cycle().await;

    let disabled = h.disabler.disabled.lock().await.clone();
    assert_eq!(disabled, vec!["bob".to_string()]);

    let messages = h.notifier.messages.lock().await.clone();
    let warning = messages
        .iter()
        .find(|m| m.starts_with("<b>Warning: </b>"))
        .expect("warning message");
    assert!(warning.contains("bob"));
    assert!(warning.contains("4 active ips"));
    assert!(warning.contains("2.2.2.1"));
}

#[tokio::test]
async fn disable_failure_leaves_later_users_processed() {
    let cfg = BotConfig {
        general_limit: Some(1),
        special_limit: HashMap::new(),
        ..base_config()
    };
    let h = harness(&cfg, Some("anna")).await;

    record(&h.snapshot, "anna", &["1.1.1.1", "1.1.1.2"]).await;
    record(&h.snapshot, "zeta", &["2.2.2.1", "2.2.2.2"]).await;
    h.ctx.run_cycle().await;

    let disabled = h.disabler.disabled.lock().await.clone();
    assert_eq!(disabled, vec!["anna".to_string(), "zeta".to_string()]);
}

#[tokio::test]
async fn cycle_end_state_matches_contract() {
    let h = harness(&base_config(), None).await;

    record(&h.snapshot, "alice", &["1.1.1.1"]).await;
    record(&h.snapshot, "bob", &["2.2.2.2"]).await;
    h.ctx.run_cycle().await;

    // Snapshot is empty for the next polling window; the streak table
    // still holds this cycle's users.
    assert!(h.snapshot.is_empty().await);
    assert_eq!(h.ctx.streak_counts().await.len(), 2);

    // The report dispatch always includes the summary line.
    let messages = h.notifier.messages.lock().await.clone();
    assert!(messages
        .iter()
        .any(|m| m.contains("Всего активных IP: <b>2</b>")));
}

#[tokio::test]
async fn enforcement_loop_stops_on_cancellation() {
    let h = harness(&base_config(), None).await;
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(run_enforcement_loop(h.ctx, shutdown.clone()));
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop must stop promptly")
        .expect("loop task must not panic");
}
