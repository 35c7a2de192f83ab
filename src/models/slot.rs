use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bookable interval at a venue, already normalised to the
/// unified shape every provider adapter emits. `last_refreshed` is
/// stamped by the staging writer at insert time, not by the normaliser,
/// so every row in one refresh shares the same ingest timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub composite_key: String,
    pub category: String,
    pub date: NaiveDate,
    pub starting_time: NaiveTime,
    pub ending_time: NaiveTime,
    pub price: String,
    pub spaces: i32,
    pub booking_url: Option<String>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn is_available(&self) -> bool {
        self.spaces > 0
    }
}
