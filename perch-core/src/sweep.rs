use chrono::Utc;
use tracing::debug;

use perch_domain::{DeskState, ReservationError};

use crate::repository::{DeskRepository, StateGuard};

/// Reclaim every desk whose hold has expired, resetting it to available.
/// Idempotent, and safe to run concurrently with releases and new holds:
/// the guarded write only applies while the hold is still the expired one.
pub async fn sweep_expired_holds(desks: &dyn DeskRepository) -> Result<usize, ReservationError> {
    let now = Utc::now();
    let mut released = 0;

    for desk in desks.list_desks().await? {
        let expired = matches!(desk.state, DeskState::Held { expires_at, .. } if expires_at <= now);
        if !expired {
            continue;
        }
        let guard = StateGuard::HeldAndExpired { now };
        if desks
            .update_desk_state(&desk.id, &DeskState::Available, &guard)
            .await?
        {
            released += 1;
        }
    }

    if released > 0 {
        debug!(released, "reclaimed expired holds");
    }
    Ok(released)
}
