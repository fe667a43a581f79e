use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::client::database::error::DatabaseError;
use crate::types::worker_details::WorkerDetails;

/// Repository for worker heartbeat rows
///
/// Rows are keyed by (worker name, internal id). Each physical worker instance
/// owns its own internal id, so no two writers ever race on the same row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerDetailsRepository: Send + Sync {
    async fn ensure_indexes(&self) -> Result<(), DatabaseError>;

    async fn find_worker(&self, worker_name: &str, internal_id: Uuid) -> Result<Option<WorkerDetails>, DatabaseError>;

    async fn insert_worker(&self, details: WorkerDetails) -> Result<(), DatabaseError>;

    /// Refresh only the heartbeat timestamp. Returns the number of rows matched.
    async fn touch_worker(&self, worker_name: &str, internal_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError>;

    /// Refresh timestamp and progress message. Returns the number of rows matched.
    async fn set_progress(
        &self,
        worker_name: &str,
        internal_id: Uuid,
        at: DateTime<Utc>,
        message: String,
    ) -> Result<u64, DatabaseError>;
}
