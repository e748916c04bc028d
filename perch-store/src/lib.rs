pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod desk_repo;
pub mod feed;
pub mod seed;

pub use app_config::Config;
pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use desk_repo::StoreDeskRepository;
pub use feed::ChangeFeed;
pub use seed::{seed_floor_plan, SeedReport};

pub(crate) fn store_err(err: sqlx::Error) -> perch_domain::ReservationError {
    perch_domain::ReservationError::Store(err.to_string())
}

/// Reassemble a time range from its nullable row columns; anything
/// incomplete or inverted comes back as no range at all.
pub(crate) fn row_range(
    from_date: Option<chrono::NaiveDate>,
    from_time: Option<chrono::NaiveTime>,
    to_date: Option<chrono::NaiveDate>,
    to_time: Option<chrono::NaiveTime>,
) -> Option<perch_domain::TimeRange> {
    perch_domain::TimeRange::new(from_date?, from_time?, to_date?, to_time?).ok()
}
