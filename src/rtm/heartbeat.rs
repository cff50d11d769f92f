use tracing::trace;

use super::constants::HEARTBEAT_INTERVAL_MS;
use super::outbox::Outbox;

/// Periodic application-level ping so the server keeps the session alive.
///
/// Started on `hello`, aborted with the session. The task also exits on
/// its own once the write side is gone.
pub(super) fn spawn_heartbeat(outbox: Outbox) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        // The first tick is immediate; pings should start one interval in.
        interval.tick().await;

        loop {
            interval.tick().await;
            if outbox.is_closed() {
                break;
            }

            let now_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            trace!("RTM ping at {}", now_ms);
            outbox.send_ping(now_ms);
        }
    })
}
