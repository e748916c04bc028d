use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timerange::TimeRange;

/// A confirmed reservation of one desk by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub desk_id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(flatten)]
    pub window: BookingWindow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a booking addresses time. Current records carry a from/to range;
/// records from the all-day era carry a bare calendar date. The two schemes
/// are never compared against each other for conflicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingWindow {
    Range(TimeRange),
    AllDay { date: NaiveDate },
}

impl BookingWindow {
    /// Whether this booking blocks a from/to request. Legacy all-day
    /// records never do.
    pub fn conflicts_with_range(&self, range: &TimeRange) -> bool {
        match self {
            BookingWindow::Range(own) => own.overlaps(range),
            BookingWindow::AllDay { .. } => false,
        }
    }

    /// Booking-to-booking conflict: range vs range by overlap, all-day vs
    /// all-day by exact date equality.
    pub fn conflicts_with(&self, other: &BookingWindow) -> bool {
        match (self, other) {
            (BookingWindow::Range(a), BookingWindow::Range(b)) => a.overlaps(b),
            (BookingWindow::AllDay { date: a }, BookingWindow::AllDay { date: b }) => a == b,
            _ => false,
        }
    }
}

impl Booking {
    pub fn new(
        desk_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        range: TimeRange,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            desk_id: desk_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            window: BookingWindow::Range(range),
            created_at: now,
            updated_at: now,
        }
    }

    /// Active while the booking's end is still in the future. All-day
    /// records count through the end of their day.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        match &self.window {
            BookingWindow::Range(range) => range.end() > now,
            BookingWindow::AllDay { date } => *date >= now.date(),
        }
    }
}
