use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ReservationError;

/// A reservation window, addressed as separate date and time parts the way
/// the booking form submits them. The interval is half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from_date: NaiveDate,
    pub from_time: NaiveTime,
    pub to_date: NaiveDate,
    pub to_time: NaiveTime,
}

impl TimeRange {
    pub fn new(
        from_date: NaiveDate,
        from_time: NaiveTime,
        to_date: NaiveDate,
        to_time: NaiveTime,
    ) -> Result<Self, ReservationError> {
        let range = Self {
            from_date,
            from_time,
            to_date,
            to_time,
        };
        if range.end() <= range.start() {
            return Err(ReservationError::Validation(
                "reservation end must be after its start".to_string(),
            ));
        }
        Ok(range)
    }

    /// Parse from wire strings: `YYYY-MM-DD` dates, `HH:MM` or `HH:MM:SS` times.
    pub fn from_parts(
        from_date: &str,
        from_time: &str,
        to_date: &str,
        to_time: &str,
    ) -> Result<Self, ReservationError> {
        Self::new(
            parse_date(from_date)?,
            parse_time(from_time)?,
            parse_date(to_date)?,
            parse_time(to_time)?,
        )
    }

    pub fn start(&self) -> NaiveDateTime {
        self.from_date.and_time(self.from_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.to_date.and_time(self.to_time)
    }

    /// Strict overlap: `start1 < end2 && start2 < end1`. Adjacent ranges
    /// sharing a boundary instant do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ReservationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ReservationError::Validation(format!("invalid date: {value}")))
}

pub fn parse_time(value: &str) -> Result<NaiveTime, ReservationError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ReservationError::Validation(format!("invalid time: {value}")))
}
