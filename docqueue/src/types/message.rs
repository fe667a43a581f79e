use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// Claimant value of a message nobody owns.
pub const UNCLAIMED: &str = "";

/// One row of the queue collection.
///
/// A row moves through three observable states:
/// - pending: `claimant` empty, `processed` false
/// - in flight: `claimant` holds the owning worker name
/// - done: `processed` true (or the row is deleted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub payload: String,
    pub claimant: String,
    /// Advisory only, claims are ordered by `last_changed`.
    pub priority: i32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_changed: DateTime<Utc>,
    pub processed: bool,
}

impl QueueMessage {
    /// Build a pending message stamped with the current time.
    pub fn new(payload: String, priority: i32) -> Self {
        Self {
            id: ObjectId::new(),
            payload,
            claimant: UNCLAIMED.to_string(),
            priority,
            last_changed: now(),
            processed: false,
        }
    }

    /// Pending rows can be claimed by any worker.
    pub fn is_pending(&self) -> bool {
        self.claimant.is_empty() && !self.processed
    }

    pub fn is_claimed_by(&self, worker_name: &str) -> bool {
        !worker_name.is_empty() && self.claimant == worker_name
    }
}

/// Current time at the store's millisecond precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
