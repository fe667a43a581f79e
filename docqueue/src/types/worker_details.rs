use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message written the first time a worker instance registers itself.
pub const WORKER_STARTED_MESSAGE: &str = "Worker started";

/// Heartbeat row for one worker instance.
///
/// `worker_internal_id` is the hyphenated form of the instance's persisted UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDetails {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub worker_internal_id: String,
    pub worker_name: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_operation_timestamp: DateTime<Utc>,
    pub last_operation_message: String,
}

impl WorkerDetails {
    pub fn started(worker_name: &str, internal_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            worker_internal_id: internal_id.to_string(),
            worker_name: worker_name.to_string(),
            last_operation_timestamp: at,
            last_operation_message: WORKER_STARTED_MESSAGE.to_string(),
        }
    }

    pub fn internal_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.worker_internal_id).ok()
    }
}

/// Progress report from a running worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProgress {
    pub message: String,
}

impl WorkerProgress {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<&str> for WorkerProgress {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for WorkerProgress {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
