//! Background loops: enforcement ticker and session poller.
//!
//! Both loops are cancellable via [`CancellationToken`] so the host can
//! shut them down cleanly instead of aborting mid-cycle.

use crate::enforcer::EnforcementContext;
use crate::panel::PanelClient;
use crate::snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often the poller asks the panel for online sessions.
const SESSION_POLL_INTERVAL_SECS: u64 = 60;

/// Run enforcement cycles until `shutdown` fires.
///
/// The interval is reloaded from config between cycles, so admins can
/// change `CHECK_INTERVAL` without a restart. A failed cycle never
/// kills the loop; the next tick retries naturally.
pub async fn run_enforcement_loop(ctx: Arc<EnforcementContext>, shutdown: CancellationToken) {
    info!("Enforcement loop started");
    loop {
        ctx.run_cycle().await;
        let interval = ctx.check_interval().await;
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    info!("Enforcement loop stopped");
}

/// Feed the session snapshot from the panel until `shutdown` fires.
///
/// Poll failures (panel not configured yet, transient HTTP errors) are
/// logged and retried on the next poll.
pub async fn run_session_poller(
    panel: Arc<PanelClient>,
    store: Arc<SnapshotStore>,
    shutdown: CancellationToken,
) {
    info!("Session poller started");
    loop {
        match panel.online_sessions().await {
            Ok(sessions) => {
                for session in sessions {
                    store.record(&session.username, session.ips).await;
                }
            }
            Err(e) => warn!("Session poll failed: {e}"),
        }
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(Duration::from_secs(SESSION_POLL_INTERVAL_SECS)) => {}
        }
    }
    info!("Session poller stopped");
}
