use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::core::client::database::error::DatabaseError;
use crate::types::message::QueueMessage;

/// Repository for queue rows (publish, claim, acknowledge)
///
/// Every mutation of a [`QueueMessage`] goes through here. The only operation
/// that coordinates concurrent workers is [`QueueRepository::claim_next`]; all
/// others are plain reads and writes issued by a worker that already owns the
/// row it touches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Provision indexes on `last_changed`, `claimant` and `processed`. Idempotent.
    async fn ensure_indexes(&self) -> Result<(), DatabaseError>;

    /// Append a message to the queue.
    async fn insert_message(&self, message: QueueMessage) -> Result<(), DatabaseError>;

    // =========================================================================
    // Claiming
    // =========================================================================

    /// Find the message currently owned by `worker_name`, if any.
    async fn find_claimed_by(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError>;

    /// Atomically claim the oldest pending message for `worker_name`
    ///
    /// Uses findOneAndUpdate so that exactly one caller can move a given row
    /// from pending to claimed. A row is claimable if:
    /// - claimant is empty
    /// - processed is false
    ///
    /// Order: ascending `last_changed`, ties broken by `_id`. Priority is not consulted.
    async fn claim_next(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError>;

    // =========================================================================
    // Acknowledging
    // =========================================================================

    /// Delete the row claimed by `worker_name`. Returns the number of rows removed.
    async fn delete_claimed(&self, worker_name: &str) -> Result<u64, DatabaseError>;

    /// Write the outcome back to the row claimed by `worker_name` and clear the claim.
    /// Returns the number of rows matched.
    async fn release_claimed(
        &self,
        worker_name: &str,
        payload: String,
        processed: bool,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError>;

    // =========================================================================
    // Inspection
    // =========================================================================

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<QueueMessage>, DatabaseError>;

    /// Number of rows that are neither claimed nor processed.
    async fn count_pending(&self) -> Result<u64, DatabaseError>;
}
