use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use perch_domain::{
    AvailabilityStatus, Booking, BookingWindow, Desk, DeskAvailability, DeskState, Hold,
    ReservationError, TimeRange,
};

use crate::repository::{BookingRepository, DeskRepository};
use crate::sweep;

/// Computes, for one requested time range, whether each desk is free, held,
/// booked, or owned by the requester. Pure read path: every call re-derives
/// status from the store, nothing is cached here.
pub struct AvailabilityEngine {
    desks: Arc<dyn DeskRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityEngine {
    pub fn new(desks: Arc<dyn DeskRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { desks, bookings }
    }

    pub async fn list_desks_with_availability(
        &self,
        range: &TimeRange,
        requesting_user_id: Option<&str>,
    ) -> Result<Vec<DeskAvailability>, ReservationError> {
        // Expired holds are reclaimed opportunistically before every read;
        // every decision below still compares expiry to now, so a failed
        // sweep only delays visual cleanup.
        if let Err(err) = sweep::sweep_expired_holds(self.desks.as_ref()).await {
            warn!("expired-hold sweep failed before availability read: {err}");
        }

        let now = Utc::now();
        let (desks, bookings) =
            tokio::try_join!(self.desks.list_desks(), self.bookings.list_bookings())?;
        let holds: Vec<Hold> = desks.iter().filter_map(|d| d.active_hold(now)).collect();

        Ok(desks
            .into_iter()
            .map(|desk| {
                let status =
                    status_for(&desk, range, requesting_user_id, &bookings, &holds, now);
                DeskAvailability { desk, status }
            })
            .collect())
    }
}

fn status_for(
    desk: &Desk,
    range: &TimeRange,
    requester: Option<&str>,
    bookings: &[Booking],
    holds: &[Hold],
    now: DateTime<Utc>,
) -> AvailabilityStatus {
    // The stored tag wins when its own window overlaps the request.
    match &desk.state {
        DeskState::Held {
            user_id,
            user_name,
            range: held_range,
            expires_at,
        } if now < *expires_at && held_range.overlaps(range) => {
            return if requester == Some(user_id.as_str()) {
                AvailabilityStatus::OwnedByRequester
            } else {
                AvailabilityStatus::HeldByOther {
                    holder: user_name.clone(),
                    expires_at: *expires_at,
                }
            };
        }
        DeskState::Booked {
            user_id,
            user_name,
            range: booked_range,
        } if booked_range.overlaps(range) => {
            if requester == Some(user_id.as_str()) {
                return AvailabilityStatus::OwnedByRequester;
            }
            let booking_id = bookings
                .iter()
                .find(|b| b.desk_id == desk.id && b.window.conflicts_with_range(range))
                .map(|b| b.id);
            return AvailabilityStatus::BookedByOther {
                booker: user_name.clone(),
                booking_id,
                range: *booked_range,
            };
        }
        _ => {}
    }

    // The desk carries only one current tag, but may have any number of
    // other bookings; fall back to scanning the full lists.
    if let Some((booking, booked_range)) = bookings.iter().find_map(|b| match &b.window {
        BookingWindow::Range(r) if b.desk_id == desk.id && r.overlaps(range) => Some((b, *r)),
        _ => None,
    }) {
        return if requester == Some(booking.user_id.as_str()) {
            AvailabilityStatus::OwnedByRequester
        } else {
            AvailabilityStatus::BookedByOther {
                booker: booking.user_name.clone(),
                booking_id: Some(booking.id),
                range: booked_range,
            }
        };
    }

    if let Some(hold) = holds
        .iter()
        .find(|h| h.desk_id == desk.id && h.range.overlaps(range))
    {
        return if requester == Some(hold.user_id.as_str()) {
            AvailabilityStatus::OwnedByRequester
        } else {
            AvailabilityStatus::HeldByOther {
                holder: hold.user_name.clone(),
                expires_at: hold.expires_at,
            }
        };
    }

    AvailabilityStatus::Free
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repository::StateGuard;
    use chrono::Duration;

    fn range(from: (&str, &str), to: (&str, &str)) -> TimeRange {
        TimeRange::from_parts(from.0, from.1, to.0, to.1).unwrap()
    }

    async fn store_with_desk() -> (Arc<MemoryStore>, AvailabilityEngine) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_desk(&Desk::new("desk-1", "Desk 1", 10, 7))
            .await
            .unwrap();
        let engine = AvailabilityEngine::new(store.clone(), store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn empty_desk_is_free() {
        let (_, engine) = store_with_desk().await;
        let listing = engine
            .list_desks_with_availability(
                &range(("2026-03-02", "09:00"), ("2026-03-02", "10:00")),
                Some("u1"),
            )
            .await
            .unwrap();

        assert_eq!(listing.len(), 1);
        assert!(matches!(listing[0].status, AvailabilityStatus::Free));
    }

    #[tokio::test]
    async fn stored_tag_for_unrelated_window_falls_back_to_booking_scan() {
        let (store, engine) = store_with_desk().await;
        let now = Utc::now();

        // Desk is tagged held for the afternoon...
        let afternoon = range(("2026-03-02", "14:00"), ("2026-03-02", "15:00"));
        store
            .update_desk_state(
                "desk-1",
                &DeskState::Held {
                    user_id: "u2".into(),
                    user_name: "Bea".into(),
                    range: afternoon,
                    expires_at: now + Duration::seconds(60),
                },
                &StateGuard::Any,
            )
            .await
            .unwrap();

        // ...while a confirmed booking covers the morning.
        let morning = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));
        store
            .insert_booking(&Booking::new("desk-1", "u3", "Cal", morning))
            .await
            .unwrap();

        let listing = engine
            .list_desks_with_availability(&morning, Some("u1"))
            .await
            .unwrap();

        match &listing[0].status {
            AvailabilityStatus::BookedByOther { booker, .. } => assert_eq!(booker, "Cal"),
            other => panic!("expected booked-by-other, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn own_booking_shows_as_owned_not_blocked() {
        let (store, engine) = store_with_desk().await;
        let morning = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));

        store
            .insert_booking(&Booking::new("desk-1", "u1", "Ada", morning))
            .await
            .unwrap();
        store
            .update_desk_state(
                "desk-1",
                &DeskState::Booked {
                    user_id: "u1".into(),
                    user_name: "Ada".into(),
                    range: morning,
                },
                &StateGuard::Any,
            )
            .await
            .unwrap();

        let listing = engine
            .list_desks_with_availability(&morning, Some("u1"))
            .await
            .unwrap();
        assert!(matches!(
            listing[0].status,
            AvailabilityStatus::OwnedByRequester
        ));

        let listing = engine
            .list_desks_with_availability(&morning, Some("u2"))
            .await
            .unwrap();
        assert!(matches!(
            listing[0].status,
            AvailabilityStatus::BookedByOther { .. }
        ));
    }

    #[tokio::test]
    async fn expired_hold_is_swept_and_never_blocks() {
        let (store, engine) = store_with_desk().await;
        let morning = range(("2026-03-02", "09:00"), ("2026-03-02", "10:00"));

        store
            .update_desk_state(
                "desk-1",
                &DeskState::Held {
                    user_id: "u2".into(),
                    user_name: "Bea".into(),
                    range: morning,
                    expires_at: Utc::now() - Duration::seconds(1),
                },
                &StateGuard::Any,
            )
            .await
            .unwrap();

        let listing = engine
            .list_desks_with_availability(&morning, Some("u1"))
            .await
            .unwrap();
        assert!(matches!(listing[0].status, AvailabilityStatus::Free));

        // The opportunistic pre-read sweep reclaimed the stale tag too.
        let desk = store.get_desk("desk-1").await.unwrap().unwrap();
        assert!(matches!(desk.state, DeskState::Available));
    }

    #[tokio::test]
    async fn legacy_all_day_booking_does_not_block_ranged_requests() {
        let (store, engine) = store_with_desk().await;

        let legacy = Booking {
            window: BookingWindow::AllDay {
                date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            },
            ..Booking::new(
                "desk-1",
                "u2",
                "Bea",
                range(("2026-03-02", "09:00"), ("2026-03-02", "10:00")),
            )
        };
        store.insert_booking(&legacy).await.unwrap();

        let listing = engine
            .list_desks_with_availability(
                &range(("2026-03-02", "09:00"), ("2026-03-02", "10:00")),
                Some("u1"),
            )
            .await
            .unwrap();
        assert!(matches!(listing[0].status, AvailabilityStatus::Free));
    }
}
