use thiserror::Error;

use crate::timerange::TimeRange;

/// Every expected, user-recoverable outcome of a reservation operation.
/// Messages are shown to the end user verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReservationError {
    #[error("Desk {0} not found")]
    DeskNotFound(String),

    #[error("Desk is currently being selected by {holder} for this time period")]
    HeldByOther { holder: String },

    #[error("You already have a booking for desk {desk_id} during this time period. You can only book one seat at a time.")]
    AlreadyBookedElsewhere { desk_id: String },

    #[error("Desk is already booked by {booker} for this time period")]
    DeskAlreadyBooked { booker: String, range: TimeRange },

    #[error("Invalid booking request: {0}")]
    Validation(String),

    #[error("Store operation failed: {0}")]
    Store(String),
}

impl ReservationError {
    /// Stable machine-readable tag for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::DeskNotFound(_) => "desk_not_found",
            ReservationError::HeldByOther { .. } => "held_by_other",
            ReservationError::AlreadyBookedElsewhere { .. } => "already_booked_elsewhere",
            ReservationError::DeskAlreadyBooked { .. } => "desk_already_booked",
            ReservationError::Validation(_) => "validation",
            ReservationError::Store(_) => "store_unavailable",
        }
    }

    /// The identity of whoever owns the conflicting hold or booking, when
    /// the error carries one.
    pub fn conflicting_holder(&self) -> Option<&str> {
        match self {
            ReservationError::HeldByOther { holder } => Some(holder),
            ReservationError::DeskAlreadyBooked { booker, .. } => Some(booker),
            _ => None,
        }
    }
}
