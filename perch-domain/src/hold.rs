use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timerange::TimeRange;

/// An ephemeral claim on a desk while a user is mid-selection. A hold is
/// advisory: it blocks overlapping selections while active but confers no
/// permanent right, and it expires silently unless converted to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub desk_id: String,
    pub user_id: String,
    pub user_name: String,
    pub range: TimeRange,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
