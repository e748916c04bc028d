use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Booking;
use crate::desk::Desk;

/// Published on the desk change feed after every desk-state write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskChangedEvent {
    pub desk: Desk,
}

/// Published on the booking change feed after every booking write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingChangedEvent {
    Created { booking: Booking },
    Cancelled {
        booking_id: Uuid,
        desk_id: String,
        user_id: String,
    },
}

impl BookingChangedEvent {
    pub fn user_id(&self) -> &str {
        match self {
            BookingChangedEvent::Created { booking } => &booking.user_id,
            BookingChangedEvent::Cancelled { user_id, .. } => user_id,
        }
    }
}
