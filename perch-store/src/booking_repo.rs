use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use perch_core::BookingRepository;
use perch_domain::{Booking, BookingChangedEvent, BookingWindow, ReservationError};

use crate::feed::ChangeFeed;
use crate::{row_range, store_err};

pub struct StoreBookingRepository {
    pool: PgPool,
    feed: ChangeFeed,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }
}

const SELECT_BOOKING: &str = "SELECT id, desk_id, user_id, user_name, \
     from_date, from_time, to_date, to_time, date, \
     created_at, updated_at FROM bookings";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    desk_id: String,
    user_id: String,
    user_name: String,
    from_date: Option<NaiveDate>,
    from_time: Option<NaiveTime>,
    to_date: Option<NaiveDate>,
    to_time: Option<NaiveTime>,
    date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    /// Rows carrying a full from/to range become ranged bookings; rows from
    /// the all-day era carry only `date`. Rows with neither are dropped
    /// from listings, the same way the conflict checks skip them.
    fn into_booking(self) -> Option<Booking> {
        let window = match (
            row_range(self.from_date, self.from_time, self.to_date, self.to_time),
            self.date,
        ) {
            (Some(range), _) => BookingWindow::Range(range),
            (None, Some(date)) => BookingWindow::AllDay { date },
            (None, None) => return None,
        };
        Some(Booking {
            id: self.id,
            desk_id: self.desk_id,
            user_id: self.user_id,
            user_name: self.user_name,
            window,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn list_bookings(&self) -> Result<Vec<Booking>, ReservationError> {
        let rows =
            sqlx::query_as::<_, BookingRow>(&format!("{SELECT_BOOKING} ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(rows.into_iter().filter_map(BookingRow::into_booking).collect())
    }

    async fn list_bookings_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Booking>, ReservationError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{SELECT_BOOKING} WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().filter_map(BookingRow::into_booking).collect())
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{SELECT_BOOKING} WHERE id = $1"))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.and_then(BookingRow::into_booking))
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), ReservationError> {
        let (range, date) = match &booking.window {
            BookingWindow::Range(range) => (Some(*range), None),
            BookingWindow::AllDay { date } => (None, Some(*date)),
        };

        let result = sqlx::query(
            "INSERT INTO bookings (id, desk_id, user_id, user_name, \
             from_date, from_time, to_date, to_time, date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(booking.id)
        .bind(&booking.desk_id)
        .bind(&booking.user_id)
        .bind(&booking.user_name)
        .bind(range.map(|r| r.from_date))
        .bind(range.map(|r| r.from_time))
        .bind(range.map(|r| r.to_date))
        .bind(range.map(|r| r.to_time))
        .bind(date)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() < 1 {
            return Err(ReservationError::Store(
                "no booking record has been created".to_string(),
            ));
        }

        let _ = self.feed.bookings.send(BookingChangedEvent::Created {
            booking: booking.clone(),
        });
        Ok(())
    }

    async fn delete_booking(&self, booking_id: Uuid) -> Result<(), ReservationError> {
        let existing = self.get_booking(booking_id).await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if let Some(booking) = existing {
            let _ = self.feed.bookings.send(BookingChangedEvent::Cancelled {
                booking_id,
                desk_id: booking.desk_id,
                user_id: booking.user_id,
            });
        }
        Ok(())
    }

    async fn desk_has_bookings(&self, desk_id: &str) -> Result<bool, ReservationError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE desk_id = $1)")
                .bind(desk_id)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(exists)
    }

    fn subscribe_booking_changes(&self) -> broadcast::Receiver<BookingChangedEvent> {
        self.feed.bookings.subscribe()
    }
}
