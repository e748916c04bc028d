use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hold::Hold;
use crate::timerange::TimeRange;

/// A bookable desk on the floor plan. `x`/`y` are map-rendering positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Desk {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(flatten)]
    pub state: DeskState,
    pub updated_at: DateTime<Utc>,
}

/// The desk's availability tag together with the fields that only exist for
/// that tag, so tag and fields cannot drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "availability", rename_all = "lowercase")]
pub enum DeskState {
    Available,
    Held {
        user_id: String,
        user_name: String,
        range: TimeRange,
        expires_at: DateTime<Utc>,
    },
    Booked {
        user_id: String,
        user_name: String,
        range: TimeRange,
    },
}

impl DeskState {
    pub fn tag(&self) -> &'static str {
        match self {
            DeskState::Available => "available",
            DeskState::Held { .. } => "held",
            DeskState::Booked { .. } => "booked",
        }
    }
}

impl Desk {
    pub fn new(id: impl Into<String>, name: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x,
            y,
            state: DeskState::Available,
            updated_at: Utc::now(),
        }
    }

    /// The desk's hold, if one is present and unexpired at `now`. An expired
    /// hold still sitting in the store counts as no hold at all.
    pub fn active_hold(&self, now: DateTime<Utc>) -> Option<Hold> {
        match &self.state {
            DeskState::Held {
                user_id,
                user_name,
                range,
                expires_at,
            } if now < *expires_at => Some(Hold {
                desk_id: self.id.clone(),
                user_id: user_id.clone(),
                user_name: user_name.clone(),
                range: *range,
                expires_at: *expires_at,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn some_range() -> TimeRange {
        TimeRange::from_parts("2026-03-02", "09:00", "2026-03-02", "10:00").unwrap()
    }

    #[test]
    fn active_hold_respects_expiry() {
        let now = Utc::now();
        let mut desk = Desk::new("desk-1", "Desk 1", 10, 7);

        desk.state = DeskState::Held {
            user_id: "u1".into(),
            user_name: "Ada".into(),
            range: some_range(),
            expires_at: now + Duration::seconds(60),
        };
        assert!(desk.active_hold(now).is_some());

        desk.state = DeskState::Held {
            user_id: "u1".into(),
            user_name: "Ada".into(),
            range: some_range(),
            expires_at: now - Duration::seconds(1),
        };
        assert!(desk.active_hold(now).is_none());
    }

    #[test]
    fn booked_desk_has_no_hold() {
        let desk = Desk {
            state: DeskState::Booked {
                user_id: "u1".into(),
                user_name: "Ada".into(),
                range: some_range(),
            },
            ..Desk::new("desk-1", "Desk 1", 10, 7)
        };
        assert!(desk.active_hold(Utc::now()).is_none());
    }

    #[test]
    fn state_serializes_with_availability_tag() {
        let desk = Desk::new("desk-1", "Desk 1", 10, 7);
        let json = serde_json::to_value(&desk).unwrap();
        assert_eq!(json["availability"], "available");
    }
}
