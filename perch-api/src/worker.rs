use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{error, info};

use perch_core::ReservationCoordinator;

/// Periodic reclamation of expired holds. The availability engine also
/// sweeps before every read; this loop bounds staleness when nobody is
/// reading, which is the only mechanism that frees a desk after a user
/// closes the tab without releasing.
pub async fn start_hold_sweeper(coordinator: Arc<ReservationCoordinator>, every_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(every_seconds.max(1)));
    info!(every_seconds, "hold sweeper started");

    loop {
        ticker.tick().await;
        match coordinator.sweep_expired_holds().await {
            Ok(0) => {}
            Ok(released) => info!(released, "sweeper reclaimed expired holds"),
            Err(err) => error!("hold sweep failed: {err}"),
        }
    }
}
