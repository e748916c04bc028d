use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use perch_domain::{
    Booking, BookingChangedEvent, Desk, DeskChangedEvent, DeskState, ReservationError,
};

use crate::repository::{BookingRepository, DeskRepository, StateGuard};

const FEED_CAPACITY: usize = 64;

/// In-memory store with the same contract as the Postgres-backed one.
/// Guards are evaluated under the write lock, so guarded updates are
/// atomic exactly as they are in SQL. Used by tests and local runs.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    desk_tx: broadcast::Sender<DeskChangedEvent>,
    booking_tx: broadcast::Sender<BookingChangedEvent>,
}

#[derive(Default)]
struct Inner {
    desks: HashMap<String, Desk>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (desk_tx, _) = broadcast::channel(FEED_CAPACITY);
        let (booking_tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: RwLock::new(Inner::default()),
            desk_tx,
            booking_tx,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeskRepository for MemoryStore {
    async fn list_desks(&self) -> Result<Vec<Desk>, ReservationError> {
        let inner = self.inner.read().await;
        let mut desks: Vec<Desk> = inner.desks.values().cloned().collect();
        desks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(desks)
    }

    async fn get_desk(&self, desk_id: &str) -> Result<Option<Desk>, ReservationError> {
        Ok(self.inner.read().await.desks.get(desk_id).cloned())
    }

    async fn insert_desk(&self, desk: &Desk) -> Result<(), ReservationError> {
        self.inner
            .write()
            .await
            .desks
            .insert(desk.id.clone(), desk.clone());
        let _ = self.desk_tx.send(DeskChangedEvent { desk: desk.clone() });
        Ok(())
    }

    async fn update_desk_state(
        &self,
        desk_id: &str,
        state: &DeskState,
        guard: &StateGuard,
    ) -> Result<bool, ReservationError> {
        let mut inner = self.inner.write().await;
        let Some(desk) = inner.desks.get_mut(desk_id) else {
            return Ok(false);
        };
        if !guard.permits(&desk.state) {
            return Ok(false);
        }
        desk.state = state.clone();
        desk.updated_at = Utc::now();
        let changed = desk.clone();
        drop(inner);
        let _ = self.desk_tx.send(DeskChangedEvent { desk: changed });
        Ok(true)
    }

    fn subscribe_desk_changes(&self) -> broadcast::Receiver<DeskChangedEvent> {
        self.desk_tx.subscribe()
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn list_bookings(&self) -> Result<Vec<Booking>, ReservationError> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner.bookings.values().cloned().collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn list_bookings_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Booking>, ReservationError> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError> {
        Ok(self.inner.read().await.bookings.get(&booking_id).cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), ReservationError> {
        self.inner
            .write()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        let _ = self.booking_tx.send(BookingChangedEvent::Created {
            booking: booking.clone(),
        });
        Ok(())
    }

    async fn delete_booking(&self, booking_id: Uuid) -> Result<(), ReservationError> {
        let removed = self.inner.write().await.bookings.remove(&booking_id);
        if let Some(booking) = removed {
            let _ = self.booking_tx.send(BookingChangedEvent::Cancelled {
                booking_id,
                desk_id: booking.desk_id,
                user_id: booking.user_id,
            });
        }
        Ok(())
    }

    async fn desk_has_bookings(&self, desk_id: &str) -> Result<bool, ReservationError> {
        let inner = self.inner.read().await;
        Ok(inner.bookings.values().any(|b| b.desk_id == desk_id))
    }

    fn subscribe_booking_changes(&self) -> broadcast::Receiver<BookingChangedEvent> {
        self.booking_tx.subscribe()
    }
}
