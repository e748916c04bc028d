pub mod coordinator;
pub mod engine;
pub mod memory;
pub mod repository;
pub mod sweep;

pub use coordinator::ReservationCoordinator;
pub use engine::AvailabilityEngine;
pub use memory::MemoryStore;
pub use repository::{BookingRepository, DeskRepository, StateGuard};
