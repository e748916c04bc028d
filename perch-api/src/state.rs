use std::sync::Arc;

use perch_core::{AvailabilityEngine, BookingRepository, DeskRepository, ReservationCoordinator};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub desks: Arc<dyn DeskRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub engine: Arc<AvailabilityEngine>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire the engine and coordinator over whichever store the caller
    /// injects; the repositories are the only handles anything holds.
    pub fn new(
        desks: Arc<dyn DeskRepository>,
        bookings: Arc<dyn BookingRepository>,
        auth: AuthConfig,
        hold_ttl_seconds: u64,
    ) -> Self {
        let engine = Arc::new(AvailabilityEngine::new(desks.clone(), bookings.clone()));
        let coordinator = Arc::new(ReservationCoordinator::new(
            desks.clone(),
            bookings.clone(),
            hold_ttl_seconds,
        ));
        Self {
            desks,
            bookings,
            engine,
            coordinator,
            auth,
        }
    }
}
