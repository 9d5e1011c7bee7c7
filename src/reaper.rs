use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::Engine;

/// Background task that auto-declines booking requests whose slot time
/// passed before the mentor responded.
pub async fn run_reaper(engine: Arc<Engine>) {
    let mut interval = tokio::time::interval(engine.config.sweep_interval);
    loop {
        interval.tick().await;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        for booking_id in engine.collect_overdue_requests(now) {
            match engine.expire_request(booking_id).await {
                Ok(()) => info!("expired overdue request {booking_id}"),
                Err(e) => {
                    // The mentor may have answered it meanwhile — that's fine
                    debug!("reaper skip {booking_id}: {e}");
                }
            }
        }
    }
}
