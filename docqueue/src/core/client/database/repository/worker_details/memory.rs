use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::r#trait::WorkerDetailsRepository;
use crate::core::client::database::error::DatabaseError;
use crate::types::worker_details::WorkerDetails;

/// Worker details collection kept in process memory.
#[derive(Default)]
pub struct InMemoryWorkerDetailsRepository {
    workers: Mutex<Vec<WorkerDetails>>,
}

impl InMemoryWorkerDetailsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(&self) -> Vec<WorkerDetails> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkerDetails>> {
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matches(details: &WorkerDetails, worker_name: &str, internal_id: Uuid) -> bool {
        details.worker_name == worker_name && details.worker_internal_id == internal_id.to_string()
    }
}

#[async_trait]
impl WorkerDetailsRepository for InMemoryWorkerDetailsRepository {
    async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_worker(&self, worker_name: &str, internal_id: Uuid) -> Result<Option<WorkerDetails>, DatabaseError> {
        Ok(self.lock().iter().find(|d| Self::matches(d, worker_name, internal_id)).cloned())
    }

    async fn insert_worker(&self, details: WorkerDetails) -> Result<(), DatabaseError> {
        self.lock().push(details);
        Ok(())
    }

    async fn touch_worker(&self, worker_name: &str, internal_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut workers = self.lock();
        match workers.iter_mut().find(|d| Self::matches(d, worker_name, internal_id)) {
            Some(details) => {
                details.last_operation_timestamp = at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_progress(
        &self,
        worker_name: &str,
        internal_id: Uuid,
        at: DateTime<Utc>,
        message: String,
    ) -> Result<u64, DatabaseError> {
        let mut workers = self.lock();
        match workers.iter_mut().find(|d| Self::matches(d, worker_name, internal_id)) {
            Some(details) => {
                details.last_operation_timestamp = at;
                details.last_operation_message = message;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
