use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::desk::Desk;
use crate::timerange::TimeRange;

/// A desk annotated with its availability for one requested time range,
/// from the point of view of one requesting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskAvailability {
    #[serde(flatten)]
    pub desk: Desk,
    pub status: AvailabilityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Free,
    /// Another user's active hold overlaps the requested range.
    HeldByOther {
        holder: String,
        expires_at: DateTime<Utc>,
    },
    /// A confirmed booking by someone else overlaps the requested range.
    BookedByOther {
        booker: String,
        booking_id: Option<Uuid>,
        range: TimeRange,
    },
    /// The requester's own hold or booking; never shown as blocked to them.
    OwnedByRequester,
}

impl AvailabilityStatus {
    /// Whether the requesting user may select this desk for the range.
    pub fn is_selectable(&self) -> bool {
        matches!(
            self,
            AvailabilityStatus::Free | AvailabilityStatus::OwnedByRequester
        )
    }
}
