//! Consecutive-activity streak tracking.
//!
//! The streak table is the cycle-to-cycle memory of the enforcer: for
//! every user it maps each active IP to the number of consecutive
//! cycles that IP has been continuously observed. An IP that skips a
//! cycle is dropped outright; its next appearance starts a new streak
//! at 1. Every transition is reported as a [`StreakEvent`] so state
//! changes stay auditable.

use std::collections::{BTreeMap, HashMap, HashSet};

/// A single streak-table transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreakEvent {
    /// An IP was observed for the first time; streak starts at 1.
    Started {
        /// User the IP belongs to.
        user: String,
        /// The observed IP address.
        ip: String,
    },
    /// An already-tracked IP was observed again.
    Incremented {
        /// User the IP belongs to.
        user: String,
        /// The observed IP address.
        ip: String,
        /// Streak value after the increment.
        streak: u64,
    },
    /// A tracked IP was absent from the current cycle and was removed.
    Dropped {
        /// User the IP belonged to.
        user: String,
        /// The removed IP address.
        ip: String,
        /// Streak value the IP had reached before disappearing.
        last_streak: u64,
    },
    /// A user was entirely absent from the current cycle.
    UserDropped {
        /// The removed user.
        user: String,
    },
}

/// Per-user mapping from IP address to consecutive-cycle streak count.
///
/// Backed by ordered maps so iteration (and therefore reporting) is
/// deterministic: users and IPs tie-break lexicographically.
#[derive(Debug, Default)]
pub struct StreakTable {
    users: BTreeMap<String, BTreeMap<String, u64>>,
}

impl StreakTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle's distinct active-IP mapping into the table.
    ///
    /// After this returns, the table holds exactly the users and IPs of
    /// `current_active` with exact consecutive-cycle counts; no stale
    /// entries remain. A user present with an empty active set is
    /// removed just like an absent user.
    pub fn apply(&mut self, current_active: &HashMap<String, Vec<String>>) -> Vec<StreakEvent> {
        let mut events = Vec::new();

        for (user, ips) in current_active {
            let current: HashSet<&str> = ips.iter().map(String::as_str).collect();
            if current.is_empty() {
                continue;
            }
            let entry = self.users.entry(user.clone()).or_default();

            // Tolerates duplicates in the input list: each IP counts once.
            let mut pending = current.clone();
            for ip in ips {
                if !pending.remove(ip.as_str()) {
                    continue;
                }
                let streak = entry.entry(ip.clone()).or_insert(0);
                *streak += 1;
                if *streak == 1 {
                    events.push(StreakEvent::Started {
                        user: user.clone(),
                        ip: ip.clone(),
                    });
                } else {
                    events.push(StreakEvent::Incremented {
                        user: user.clone(),
                        ip: ip.clone(),
                        streak: *streak,
                    });
                }
            }

            let stale: Vec<String> = entry
                .keys()
                .filter(|ip| !current.contains(ip.as_str()))
                .cloned()
                .collect();
            for ip in stale {
                if let Some(last_streak) = entry.remove(&ip) {
                    events.push(StreakEvent::Dropped {
                        user: user.clone(),
                        ip,
                        last_streak,
                    });
                }
            }
        }

        let gone: Vec<String> = self
            .users
            .keys()
            .filter(|user| {
                current_active
                    .get(*user)
                    .is_none_or(|ips| ips.is_empty())
            })
            .cloned()
            .collect();
        for user in gone {
            self.users.remove(&user);
            events.push(StreakEvent::UserDropped { user });
        }

        events
    }

    /// Iterate users with their IP→streak maps, in username order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, u64>)> {
        self.users.iter()
    }

    /// IP→streak map for one user.
    #[must_use]
    pub fn user_ips(&self, user: &str) -> Option<&BTreeMap<String, u64>> {
        self.users.get(user)
    }

    /// Total count of tracked IPs across all users.
    #[must_use]
    pub fn total_ips(&self) -> usize {
        self.users.values().map(BTreeMap::len).sum()
    }

    /// Number of tracked users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(user, ips)| {
                (
                    (*user).to_string(),
                    ips.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn streak_increments_while_continuously_active() {
        let mut table = StreakTable::new();
        for _ in 0..3 {
            table.apply(&active(&[("alice", &["1.1.1.1"])]));
        }
        assert_eq!(
            table.user_ips("alice").and_then(|m| m.get("1.1.1.1")),
            Some(&3)
        );
    }

    #[test]
    fn absent_ip_is_removed_and_restarts_at_one() {
        let mut table = StreakTable::new();
        table.apply(&active(&[("alice", &["1.1.1.1", "2.2.2.2"])]));
        table.apply(&active(&[("alice", &["1.1.1.1", "2.2.2.2"])]));

        let events = table.apply(&active(&[("alice", &["1.1.1.1"])]));
        assert!(events.contains(&StreakEvent::Dropped {
            user: "alice".to_string(),
            ip: "2.2.2.2".to_string(),
            last_streak: 2,
        }));
        assert_eq!(table.user_ips("alice").map(BTreeMap::len), Some(1));

        let events = table.apply(&active(&[("alice", &["1.1.1.1", "2.2.2.2"])]));
        assert!(events.contains(&StreakEvent::Started {
            user: "alice".to_string(),
            ip: "2.2.2.2".to_string(),
        }));
        assert_eq!(
            table.user_ips("alice").and_then(|m| m.get("2.2.2.2")),
            Some(&1)
        );
    }

    #[test]
    fn absent_user_is_dropped_entirely() {
        let mut table = StreakTable::new();
        table.apply(&active(&[("alice", &["1.1.1.1"]), ("bob", &["9.9.9.9"])]));

        let events = table.apply(&active(&[("bob", &["9.9.9.9"])]));
        assert!(events.contains(&StreakEvent::UserDropped {
            user: "alice".to_string(),
        }));
        assert!(table.user_ips("alice").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn user_with_empty_active_set_is_dropped() {
        let mut table = StreakTable::new();
        table.apply(&active(&[("alice", &["1.1.1.1", "2.2.2.2"])]));

        let events = table.apply(&active(&[("alice", &[])]));
        assert!(events.contains(&StreakEvent::UserDropped {
            user: "alice".to_string(),
        }));
        assert!(table.is_empty());
    }

    #[test]
    fn transition_events_are_tagged() {
        let mut table = StreakTable::new();
        let events = table.apply(&active(&[("alice", &["1.1.1.1"])]));
        assert_eq!(
            events,
            vec![StreakEvent::Started {
                user: "alice".to_string(),
                ip: "1.1.1.1".to_string(),
            }]
        );

        let events = table.apply(&active(&[("alice", &["1.1.1.1"])]));
        assert_eq!(
            events,
            vec![StreakEvent::Incremented {
                user: "alice".to_string(),
                ip: "1.1.1.1".to_string(),
                streak: 2,
            }]
        );
    }
}
