use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;

use perch_core::{DeskRepository, StateGuard};
use perch_domain::{Desk, DeskChangedEvent, DeskState, ReservationError};

use crate::feed::ChangeFeed;
use crate::{row_range, store_err};

pub struct StoreDeskRepository {
    pool: PgPool,
    feed: ChangeFeed,
}

impl StoreDeskRepository {
    pub fn new(pool: PgPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }
}

const SELECT_DESK: &str = "SELECT id, name, x, y, availability, \
     held_by, held_by_user_id, held_expires_at, \
     held_from_date, held_from_time, held_to_date, held_to_time, \
     booked_by, booked_by_user_id, \
     booked_from_date, booked_from_time, booked_to_date, booked_to_time, \
     updated_at FROM desks";

const UPDATE_STATE: &str = "UPDATE desks SET availability = $2, \
     held_by = $3, held_by_user_id = $4, held_expires_at = $5, \
     held_from_date = $6, held_from_time = $7, held_to_date = $8, held_to_time = $9, \
     booked_by = $10, booked_by_user_id = $11, \
     booked_from_date = $12, booked_from_time = $13, booked_to_date = $14, booked_to_time = $15, \
     updated_at = NOW() WHERE id = $1";

// Desk rows keep one column per optional field; the row <-> DeskState
// conversion below is the only place the two shapes meet.
#[derive(sqlx::FromRow)]
struct DeskRow {
    id: String,
    name: String,
    x: i32,
    y: i32,
    availability: String,
    held_by: Option<String>,
    held_by_user_id: Option<String>,
    held_expires_at: Option<DateTime<Utc>>,
    held_from_date: Option<NaiveDate>,
    held_from_time: Option<NaiveTime>,
    held_to_date: Option<NaiveDate>,
    held_to_time: Option<NaiveTime>,
    booked_by: Option<String>,
    booked_by_user_id: Option<String>,
    booked_from_date: Option<NaiveDate>,
    booked_from_time: Option<NaiveTime>,
    booked_to_date: Option<NaiveDate>,
    booked_to_time: Option<NaiveTime>,
    updated_at: DateTime<Utc>,
}

impl DeskRow {
    fn into_desk(self) -> Desk {
        let state = match self.availability.as_str() {
            "held" => match (
                self.held_by_user_id,
                self.held_by,
                self.held_expires_at,
                row_range(
                    self.held_from_date,
                    self.held_from_time,
                    self.held_to_date,
                    self.held_to_time,
                ),
            ) {
                (Some(user_id), Some(user_name), Some(expires_at), Some(range)) => {
                    DeskState::Held {
                        user_id,
                        user_name,
                        range,
                        expires_at,
                    }
                }
                // A held tag with incomplete fields blocks nobody.
                _ => DeskState::Available,
            },
            "booked" => match (
                self.booked_by_user_id,
                self.booked_by,
                row_range(
                    self.booked_from_date,
                    self.booked_from_time,
                    self.booked_to_date,
                    self.booked_to_time,
                ),
            ) {
                (Some(user_id), Some(user_name), Some(range)) => DeskState::Booked {
                    user_id,
                    user_name,
                    range,
                },
                _ => DeskState::Available,
            },
            _ => DeskState::Available,
        };

        Desk {
            id: self.id,
            name: self.name,
            x: self.x,
            y: self.y,
            state,
            updated_at: self.updated_at,
        }
    }
}

/// The desk row image of a `DeskState`: every per-tag column, with the
/// columns of the other tags nulled out.
#[derive(Default)]
struct StateCols {
    availability: &'static str,
    held_by: Option<String>,
    held_by_user_id: Option<String>,
    held_expires_at: Option<DateTime<Utc>>,
    held_from_date: Option<NaiveDate>,
    held_from_time: Option<NaiveTime>,
    held_to_date: Option<NaiveDate>,
    held_to_time: Option<NaiveTime>,
    booked_by: Option<String>,
    booked_by_user_id: Option<String>,
    booked_from_date: Option<NaiveDate>,
    booked_from_time: Option<NaiveTime>,
    booked_to_date: Option<NaiveDate>,
    booked_to_time: Option<NaiveTime>,
}

impl From<&DeskState> for StateCols {
    fn from(state: &DeskState) -> Self {
        match state {
            DeskState::Available => StateCols {
                availability: "available",
                ..StateCols::default()
            },
            DeskState::Held {
                user_id,
                user_name,
                range,
                expires_at,
            } => StateCols {
                availability: "held",
                held_by: Some(user_name.clone()),
                held_by_user_id: Some(user_id.clone()),
                held_expires_at: Some(*expires_at),
                held_from_date: Some(range.from_date),
                held_from_time: Some(range.from_time),
                held_to_date: Some(range.to_date),
                held_to_time: Some(range.to_time),
                ..StateCols::default()
            },
            DeskState::Booked {
                user_id,
                user_name,
                range,
            } => StateCols {
                availability: "booked",
                booked_by: Some(user_name.clone()),
                booked_by_user_id: Some(user_id.clone()),
                booked_from_date: Some(range.from_date),
                booked_from_time: Some(range.from_time),
                booked_to_date: Some(range.to_date),
                booked_to_time: Some(range.to_time),
                ..StateCols::default()
            },
        }
    }
}

/// Guard condition appended to the state update, so the check and the
/// write are one atomic statement on the store side. Bind numbering
/// continues after the 15 SET parameters.
fn guard_condition(guard: &StateGuard) -> &'static str {
    match guard {
        StateGuard::Any => "",
        StateGuard::HeldBy { .. } => " AND availability = 'held' AND held_by_user_id = $16",
        StateGuard::HeldAndExpired { .. } => {
            " AND availability = 'held' AND held_expires_at <= $16"
        }
        StateGuard::ClaimableFor { .. } => {
            " AND (availability = 'available' \
             OR (availability = 'held' AND (held_by_user_id = $16 \
                 OR held_expires_at <= $17 \
                 OR NOT (held_from_date + held_from_time < $19 AND $18 < held_to_date + held_to_time))) \
             OR (availability = 'booked' AND \
                 NOT (booked_from_date + booked_from_time < $19 AND $18 < booked_to_date + booked_to_time)))"
        }
    }
}

#[async_trait]
impl DeskRepository for StoreDeskRepository {
    async fn list_desks(&self) -> Result<Vec<Desk>, ReservationError> {
        let rows = sqlx::query_as::<_, DeskRow>(&format!("{SELECT_DESK} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(DeskRow::into_desk).collect())
    }

    async fn get_desk(&self, desk_id: &str) -> Result<Option<Desk>, ReservationError> {
        let row = sqlx::query_as::<_, DeskRow>(&format!("{SELECT_DESK} WHERE id = $1"))
            .bind(desk_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(DeskRow::into_desk))
    }

    async fn insert_desk(&self, desk: &Desk) -> Result<(), ReservationError> {
        let cols = StateCols::from(&desk.state);
        sqlx::query(
            "INSERT INTO desks (id, name, x, y, availability, \
             held_by, held_by_user_id, held_expires_at, \
             held_from_date, held_from_time, held_to_date, held_to_time, \
             booked_by, booked_by_user_id, \
             booked_from_date, booked_from_time, booked_to_date, booked_to_time, \
             updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, NOW())",
        )
        .bind(&desk.id)
        .bind(&desk.name)
        .bind(desk.x)
        .bind(desk.y)
        .bind(cols.availability)
        .bind(cols.held_by)
        .bind(cols.held_by_user_id)
        .bind(cols.held_expires_at)
        .bind(cols.held_from_date)
        .bind(cols.held_from_time)
        .bind(cols.held_to_date)
        .bind(cols.held_to_time)
        .bind(cols.booked_by)
        .bind(cols.booked_by_user_id)
        .bind(cols.booked_from_date)
        .bind(cols.booked_from_time)
        .bind(cols.booked_to_date)
        .bind(cols.booked_to_time)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        let _ = self.feed.desks.send(DeskChangedEvent { desk: desk.clone() });
        Ok(())
    }

    async fn update_desk_state(
        &self,
        desk_id: &str,
        state: &DeskState,
        guard: &StateGuard,
    ) -> Result<bool, ReservationError> {
        let cols = StateCols::from(state);
        let sql = format!("{UPDATE_STATE}{}", guard_condition(guard));

        let mut query = sqlx::query(&sql)
            .bind(desk_id)
            .bind(cols.availability)
            .bind(cols.held_by)
            .bind(cols.held_by_user_id)
            .bind(cols.held_expires_at)
            .bind(cols.held_from_date)
            .bind(cols.held_from_time)
            .bind(cols.held_to_date)
            .bind(cols.held_to_time)
            .bind(cols.booked_by)
            .bind(cols.booked_by_user_id)
            .bind(cols.booked_from_date)
            .bind(cols.booked_from_time)
            .bind(cols.booked_to_date)
            .bind(cols.booked_to_time);
        query = match guard {
            StateGuard::Any => query,
            StateGuard::HeldBy { user_id } => query.bind(user_id.clone()),
            StateGuard::HeldAndExpired { now } => query.bind(*now),
            StateGuard::ClaimableFor {
                user_id,
                range,
                now,
            } => query
                .bind(user_id.clone())
                .bind(*now)
                .bind(range.start())
                .bind(range.end()),
        };

        let result = query.execute(&self.pool).await.map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(desk) = self.get_desk(desk_id).await? {
            let _ = self.feed.desks.send(DeskChangedEvent { desk });
        }
        Ok(true)
    }

    fn subscribe_desk_changes(&self) -> broadcast::Receiver<DeskChangedEvent> {
        self.feed.desks.subscribe()
    }
}
