pub mod availability;
pub mod booking;
pub mod desk;
pub mod error;
pub mod events;
pub mod hold;
pub mod timerange;

pub use availability::{AvailabilityStatus, DeskAvailability};
pub use booking::{Booking, BookingWindow};
pub use desk::{Desk, DeskState};
pub use error::ReservationError;
pub use events::{BookingChangedEvent, DeskChangedEvent};
pub use hold::Hold;
pub use timerange::TimeRange;
