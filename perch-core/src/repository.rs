use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use perch_domain::{
    Booking, BookingChangedEvent, Desk, DeskChangedEvent, DeskState, ReservationError, TimeRange,
};

/// Condition a store evaluates atomically when a desk state is written.
/// Writing through a guard collapses the check-then-write sequence into a
/// single store operation; a rejected guard means another writer got there
/// first and the caller re-reads to find out who.
#[derive(Debug, Clone)]
pub enum StateGuard {
    /// Unconditional overwrite.
    Any,
    /// The desk can still be claimed by `user_id` for `range`: it is
    /// available, under the same user's hold, under an expired hold, or
    /// tagged for a window that does not overlap `range`.
    ClaimableFor {
        user_id: String,
        range: TimeRange,
        now: DateTime<Utc>,
    },
    /// The desk is currently held by `user_id`.
    HeldBy { user_id: String },
    /// The desk is held and the hold has already expired.
    HeldAndExpired { now: DateTime<Utc> },
}

impl StateGuard {
    /// Reference evaluation against a current state. Store implementations
    /// either call this under their own lock or translate it to an
    /// equivalent conditional write.
    pub fn permits(&self, state: &DeskState) -> bool {
        match self {
            StateGuard::Any => true,
            StateGuard::ClaimableFor {
                user_id,
                range,
                now,
            } => match state {
                DeskState::Available => true,
                DeskState::Held {
                    user_id: held_by,
                    range: held_range,
                    expires_at,
                    ..
                } => held_by == user_id || *expires_at <= *now || !held_range.overlaps(range),
                DeskState::Booked {
                    range: booked_range,
                    ..
                } => !booked_range.overlaps(range),
            },
            StateGuard::HeldBy { user_id } => {
                matches!(state, DeskState::Held { user_id: held_by, .. } if held_by == user_id)
            }
            StateGuard::HeldAndExpired { now } => {
                matches!(state, DeskState::Held { expires_at, .. } if *expires_at <= *now)
            }
        }
    }
}

#[async_trait]
pub trait DeskRepository: Send + Sync {
    async fn list_desks(&self) -> Result<Vec<Desk>, ReservationError>;

    async fn get_desk(&self, desk_id: &str) -> Result<Option<Desk>, ReservationError>;

    async fn insert_desk(&self, desk: &Desk) -> Result<(), ReservationError>;

    /// Overwrite the desk's whole state if `guard` still permits it.
    /// Returns false when the guard rejected the write or the desk does
    /// not exist.
    async fn update_desk_state(
        &self,
        desk_id: &str,
        state: &DeskState,
        guard: &StateGuard,
    ) -> Result<bool, ReservationError>;

    fn subscribe_desk_changes(&self) -> broadcast::Receiver<DeskChangedEvent>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings(&self) -> Result<Vec<Booking>, ReservationError>;

    async fn list_bookings_for_user(&self, user_id: &str)
        -> Result<Vec<Booking>, ReservationError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError>;

    async fn insert_booking(&self, booking: &Booking) -> Result<(), ReservationError>;

    async fn delete_booking(&self, booking_id: Uuid) -> Result<(), ReservationError>;

    /// Whether any booking still references the desk, regardless of range.
    async fn desk_has_bookings(&self, desk_id: &str) -> Result<bool, ReservationError>;

    fn subscribe_booking_changes(&self) -> broadcast::Receiver<BookingChangedEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from: (&str, &str), to: (&str, &str)) -> TimeRange {
        TimeRange::from_parts(from.0, from.1, to.0, to.1).unwrap()
    }

    fn held(user: &str, r: TimeRange, expires_at: DateTime<Utc>) -> DeskState {
        DeskState::Held {
            user_id: user.to_string(),
            user_name: user.to_string(),
            range: r,
            expires_at,
        }
    }

    #[test]
    fn claimable_guard_rejects_live_foreign_hold() {
        let now = Utc::now();
        let r = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));
        let guard = StateGuard::ClaimableFor {
            user_id: "u2".into(),
            range: r,
            now,
        };

        let state = held("u1", r, now + chrono::Duration::seconds(60));
        assert!(!guard.permits(&state));
    }

    #[test]
    fn claimable_guard_accepts_own_expired_or_disjoint_holds() {
        let now = Utc::now();
        let r = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));
        let later = range(("2026-03-02", "11:00"), ("2026-03-02", "12:00"));
        let guard = StateGuard::ClaimableFor {
            user_id: "u2".into(),
            range: r,
            now,
        };

        assert!(guard.permits(&DeskState::Available));
        assert!(guard.permits(&held("u2", r, now + chrono::Duration::seconds(60))));
        assert!(guard.permits(&held("u1", r, now - chrono::Duration::seconds(1))));
        assert!(guard.permits(&held("u1", later, now + chrono::Duration::seconds(60))));
    }

    #[test]
    fn held_and_expired_guard_spares_live_holds() {
        let now = Utc::now();
        let r = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));
        let guard = StateGuard::HeldAndExpired { now };

        assert!(guard.permits(&held("u1", r, now - chrono::Duration::seconds(1))));
        assert!(!guard.permits(&held("u1", r, now + chrono::Duration::seconds(60))));
        assert!(!guard.permits(&DeskState::Available));
    }
}
