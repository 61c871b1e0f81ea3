//! Availability heartbeat: one recurring task that samples every known host.
//!
//! The recorder never touches `last_seen`, so a host that stops reporting
//! still produces an uninterrupted availability series. Ticks do not
//! overlap, and a tick that runs long skips the missed firings instead of
//! accumulating a backlog. The task ends with the process.

use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::outbound::persistence::Store;

/// Availability cadence; independent of any agent's poll interval.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

pub async fn run(store: Store, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let store = store.clone();
        let now = Utc::now();
        match tokio::task::spawn_blocking(move || store.record_availability_for_all(now)).await {
            Ok(Ok(written)) => debug!(hosts = written, "availability samples recorded"),
            // Heartbeat failures recover locally; the next tick retries.
            Ok(Err(err)) => warn!(error = %err, "availability tick failed"),
            Err(err) => warn!(error = %err, "availability tick did not complete"),
        }
    }
}
