use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use cinebook_booking::ExpirationSweeper;

/// Periodic expiration sweep. Owns its own store handle through the
/// sweeper; a failed pass is logged and retried on the next tick, never
/// allowed to take the process down.
pub async fn start_expiration_worker(sweeper: Arc<ExpirationSweeper>, interval: Duration) {
    info!("Expiration worker started, sweeping every {:?}", interval);
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        match sweeper.run_once().await {
            Ok(outcome) if outcome.expired > 0 => {
                info!("released seats from {} expired bookings", outcome.expired);
            }
            Ok(_) => {}
            Err(e) => {
                error!("sweep failed, retrying next tick: {}", e);
            }
        }
    }
}
