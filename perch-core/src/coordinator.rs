use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use perch_domain::{
    Booking, BookingWindow, DeskState, Hold, ReservationError, TimeRange,
};

use crate::repository::{BookingRepository, DeskRepository, StateGuard};
use crate::sweep;

/// Mutates hold and booking state, enforcing single-writer-wins semantics
/// for overlapping requests. Reads are best-effort; the final desk-state
/// write of each claim goes through a store-side guard, so the commit
/// itself is atomic.
pub struct ReservationCoordinator {
    desks: Arc<dyn DeskRepository>,
    bookings: Arc<dyn BookingRepository>,
    hold_ttl: Duration,
}

impl ReservationCoordinator {
    pub fn new(
        desks: Arc<dyn DeskRepository>,
        bookings: Arc<dyn BookingRepository>,
        hold_ttl_seconds: u64,
    ) -> Self {
        Self {
            desks,
            bookings,
            hold_ttl: Duration::seconds(hold_ttl_seconds as i64),
        }
    }

    /// Claim a desk while the user is mid-selection. The hold expires on
    /// its own after the TTL unless converted to a booking.
    pub async fn create_hold(
        &self,
        desk_id: &str,
        user_id: &str,
        user_name: &str,
        range: TimeRange,
    ) -> Result<Hold, ReservationError> {
        let now = Utc::now();

        let desk = self
            .desks
            .get_desk(desk_id)
            .await?
            .ok_or_else(|| ReservationError::DeskNotFound(desk_id.to_string()))?;

        self.check_live_hold(&desk.state, user_id, &range, now)?;
        self.check_booking_conflicts(desk_id, user_id, &range, now)
            .await?;

        let expires_at = now + self.hold_ttl;
        let state = DeskState::Held {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            range,
            expires_at,
        };
        let guard = StateGuard::ClaimableFor {
            user_id: user_id.to_string(),
            range,
            now,
        };
        if !self.desks.update_desk_state(desk_id, &state, &guard).await? {
            return Err(self.current_conflict(desk_id, now).await?);
        }

        info!(desk_id, user_id, "hold created");
        Ok(Hold {
            desk_id: desk_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            range,
            expires_at,
        })
    }

    /// Release the user's hold on a desk. Best effort: releasing a desk
    /// that is not held, or held by someone else, is a silent success, and
    /// repeated calls are harmless.
    pub async fn release_hold(
        &self,
        desk_id: &str,
        user_id: &str,
    ) -> Result<(), ReservationError> {
        let Some(desk) = self.desks.get_desk(desk_id).await? else {
            return Ok(());
        };
        if !matches!(&desk.state, DeskState::Held { user_id: held_by, .. } if held_by == user_id) {
            return Ok(());
        }

        let guard = StateGuard::HeldBy {
            user_id: user_id.to_string(),
        };
        if self
            .desks
            .update_desk_state(desk_id, &DeskState::Available, &guard)
            .await?
        {
            debug!(desk_id, user_id, "hold released");
        }
        Ok(())
    }

    /// Confirm a booking. Every conflict check runs again here, immediately
    /// before the write: the caller's availability snapshot may be minutes
    /// old by the time they commit.
    pub async fn create_booking(
        &self,
        desk_id: &str,
        user_id: &str,
        user_name: &str,
        range: TimeRange,
    ) -> Result<Booking, ReservationError> {
        let now = Utc::now();

        let desk = self
            .desks
            .get_desk(desk_id)
            .await?
            .ok_or_else(|| ReservationError::DeskNotFound(desk_id.to_string()))?;

        self.check_live_hold(&desk.state, user_id, &range, now)?;
        self.check_booking_conflicts(desk_id, user_id, &range, now)
            .await?;

        // The guarded tag write is the serialization point: claiming the
        // desk also clears any hold fields in one step. Only then does the
        // booking record itself get written.
        let state = DeskState::Booked {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            range,
        };
        let guard = StateGuard::ClaimableFor {
            user_id: user_id.to_string(),
            range,
            now,
        };
        if !self.desks.update_desk_state(desk_id, &state, &guard).await? {
            return Err(self.current_conflict(desk_id, now).await?);
        }

        let booking = Booking::new(desk_id, user_id, user_name, range);
        if let Err(err) = self.bookings.insert_booking(&booking).await {
            warn!(desk_id, "booking insert failed after desk claim, rolling tag back: {err}");
            let _ = self
                .desks
                .update_desk_state(desk_id, &DeskState::Available, &StateGuard::Any)
                .await;
            return Err(err);
        }

        info!(desk_id, user_id, booking_id = %booking.id, "booking confirmed");
        Ok(booking)
    }

    /// Cancel a booking and reconcile the owning desk's tag. Cancelling an
    /// unknown id is a no-op.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<(), ReservationError> {
        let Some(booking) = self.bookings.get_booking(booking_id).await? else {
            return Ok(());
        };

        self.bookings.delete_booking(booking_id).await?;

        // Order matters: other bookings on the desk (range-blind, by
        // design) keep the tag as-is; an unexpired hold survives; only
        // then does the desk revert to available.
        if self.bookings.desk_has_bookings(&booking.desk_id).await? {
            info!(booking_id = %booking_id, "booking cancelled, desk still referenced");
            return Ok(());
        }

        let Some(desk) = self.desks.get_desk(&booking.desk_id).await? else {
            return Ok(());
        };
        let now = Utc::now();
        if desk.active_hold(now).is_some() {
            info!(booking_id = %booking_id, desk_id = %desk.id, "booking cancelled, live hold preserved");
            return Ok(());
        }
        if !matches!(desk.state, DeskState::Available) {
            self.desks
                .update_desk_state(&booking.desk_id, &DeskState::Available, &StateGuard::Any)
                .await?;
        }

        info!(booking_id = %booking_id, desk_id = %desk.id, "booking cancelled");
        Ok(())
    }

    /// Reclaim expired holds across all desks. Runs on a fixed interval
    /// from the background worker, and opportunistically before reads.
    pub async fn sweep_expired_holds(&self) -> Result<usize, ReservationError> {
        sweep::sweep_expired_holds(self.desks.as_ref()).await
    }

    /// Precondition: the desk must not be under another user's live,
    /// overlapping hold.
    fn check_live_hold(
        &self,
        state: &DeskState,
        user_id: &str,
        range: &TimeRange,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if let DeskState::Held {
            user_id: held_by,
            user_name: holder,
            range: held_range,
            expires_at,
        } = state
        {
            if held_by != user_id && now < *expires_at && held_range.overlaps(range) {
                return Err(ReservationError::HeldByOther {
                    holder: holder.clone(),
                });
            }
        }
        Ok(())
    }

    /// Preconditions shared by hold and booking creation: the requesting
    /// user must not already hold or have booked any desk for an
    /// overlapping range, and the target desk must not carry a confirmed
    /// overlapping booking by anyone.
    async fn check_booking_conflicts(
        &self,
        desk_id: &str,
        user_id: &str,
        range: &TimeRange,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        let all = self.bookings.list_bookings().await?;

        if let Some(own) = all
            .iter()
            .find(|b| b.user_id == user_id && b.window.conflicts_with_range(range))
        {
            return Err(ReservationError::AlreadyBookedElsewhere {
                desk_id: own.desk_id.clone(),
            });
        }

        if let Some(held_elsewhere) = self
            .desks
            .list_desks()
            .await?
            .iter()
            .filter(|d| d.id != desk_id)
            .filter_map(|d| d.active_hold(now))
            .find(|h| h.user_id == user_id && h.range.overlaps(range))
        {
            return Err(ReservationError::AlreadyBookedElsewhere {
                desk_id: held_elsewhere.desk_id,
            });
        }

        if let Some((other, booked_range)) = all.iter().find_map(|b| match &b.window {
            BookingWindow::Range(r) if b.desk_id == desk_id && r.overlaps(range) => {
                Some((b, *r))
            }
            _ => None,
        }) {
            return Err(ReservationError::DeskAlreadyBooked {
                booker: other.user_name.clone(),
                range: booked_range,
            });
        }

        Ok(())
    }

    /// A guarded write was rejected: re-read the desk to name whoever owns
    /// it now, so the caller can present "X just took this" feedback.
    async fn current_conflict(
        &self,
        desk_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReservationError, ReservationError> {
        let Some(desk) = self.desks.get_desk(desk_id).await? else {
            return Ok(ReservationError::DeskNotFound(desk_id.to_string()));
        };
        Ok(match desk.state {
            DeskState::Held {
                user_name,
                expires_at,
                ..
            } if now < expires_at => ReservationError::HeldByOther { holder: user_name },
            DeskState::Booked {
                user_name, range, ..
            } => ReservationError::DeskAlreadyBooked {
                booker: user_name,
                range,
            },
            _ => ReservationError::Store(
                "desk state changed concurrently, please retry".to_string(),
            ),
        })
    }
}
