//! Keep-alive pings for live observers.
//!
//! Annotation pages can sit idle for minutes while the pipeline works in the
//! background. Periodic Ping frames keep proxies from closing those quiet
//! connections before the next track event arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ws::manager::WsManager;

/// Default spacing between two pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Ping every observer each `every`, starting one interval from now.
///
/// Rounds with no observers are skipped. `main` aborts the handle on
/// shutdown.
pub fn start_heartbeat(ws_manager: Arc<WsManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            let observers = ws_manager.connection_count().await;
            if observers == 0 {
                continue;
            }
            tracing::trace!(observers, "Pinging live observers");
            ws_manager.ping_all().await;
        }
    })
}
