use tokio::sync::broadcast;

use perch_domain::{BookingChangedEvent, DeskChangedEvent};

const FEED_CAPACITY: usize = 256;

/// In-process fan-out for store writes. Repositories publish here after
/// every successful write; SSE handlers subscribe one receiver per client.
/// This is the real-time transport the UI's live availability rides on.
#[derive(Clone)]
pub struct ChangeFeed {
    pub desks: broadcast::Sender<DeskChangedEvent>,
    pub bookings: broadcast::Sender<BookingChangedEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (desks, _) = broadcast::channel(FEED_CAPACITY);
        let (bookings, _) = broadcast::channel(FEED_CAPACITY);
        Self { desks, bookings }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
