//! Session snapshot store.
//!
//! The session poller records every (user, ip) sighting of the current
//! polling window here; the enforcement cycle drains the store, reduces
//! the raw occurrence lists to distinct IPs, and leaves the store empty
//! for the next window.

use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::info;

/// Shared store of raw IP sightings for the current polling window.
///
/// Occurrence lists may contain duplicates across overlapping polls;
/// [`reduce`] collapses them.
#[derive(Default)]
pub struct SnapshotStore {
    inner: Mutex<HashMap<String, Vec<String>>>,
}

impl SnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw IP sightings for a user.
    pub async fn record(&self, user: &str, ips: impl IntoIterator<Item = String>) {
        let mut inner = self.inner.lock().await;
        inner.entry(user.to_string()).or_default().extend(ips);
    }

    /// Take the whole snapshot, leaving the store empty.
    pub async fn drain(&self) -> HashMap<String, Vec<String>> {
        let mut inner = self.inner.lock().await;
        std::mem::take(&mut *inner)
    }

    /// Whether the store currently holds no sightings.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Collapse a raw occurrence list to its distinct values, keeping
/// first-occurrence order.
#[must_use]
pub fn dedup_ips(ips: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ips.iter()
        .filter(|ip| seen.insert(ip.as_str()))
        .cloned()
        .collect()
}

/// Reduce a raw snapshot to the per-user distinct active-IP mapping.
///
/// Logs the per-user sets and the aggregate count. Missing or empty
/// occurrence lists reduce to zero IPs; there are no failure modes.
#[must_use]
pub fn reduce(snapshot: &HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    let mut active: HashMap<String, Vec<String>> = HashMap::with_capacity(snapshot.len());
    for (user, raw) in snapshot {
        let unique = dedup_ips(raw);
        info!("User snapshot: {} -> {:?}", user, unique);
        active.insert(user.clone(), unique);
    }
    let total: usize = active.values().map(Vec::len).sum();
    info!("Active IP addresses this window: {}", total);
    active
}
