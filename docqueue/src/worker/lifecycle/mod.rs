//! Worker liveness reporting.
//!
//! Writes one heartbeat row per worker instance into the worker details
//! collection. External monitoring reads these rows; the queue itself never does.

mod identity;

pub use identity::{FileIdentityProvider, IdentityProvider, StaticIdentityProvider};

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::core::client::database::{DatabaseError, MongoWorkerDetailsRepository, WorkerDetailsRepository};
use crate::core::client::MongoClient;
use crate::core::error::QueueResult;
pub use crate::types::worker_details::WorkerProgress;
use crate::types::message::now;
use crate::types::worker_details::WorkerDetails;

pub struct WorkerLifecycle {
    repository: Arc<dyn WorkerDetailsRepository>,
    worker_name: String,
    identity: Arc<dyn IdentityProvider>,
}

impl WorkerLifecycle {
    pub fn new(
        repository: Arc<dyn WorkerDetailsRepository>,
        worker_name: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self { repository, worker_name: worker_name.into(), identity }
    }

    /// Connect to MongoDB and use the identity file named in the settings.
    pub async fn connect(config: &WorkerConfig) -> QueueResult<Self> {
        config.validate()?;
        let client = MongoClient::new(&config.database.connection_url, &config.database.database_name).await?;
        let repository = MongoWorkerDetailsRepository::new(Arc::new(client));
        repository.ensure_indexes().await?;

        let identity = FileIdentityProvider::new(config.identity_file.clone());
        debug!(worker_name = %config.worker_name, identity_file = %identity.path().display(), "Using file identity");

        Ok(Self::new(
            Arc::new(repository),
            config.worker_name.clone(),
            Arc::new(identity),
        ))
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Register this instance, or refresh its heartbeat if it registered before.
    pub async fn start_worker(&self) -> QueueResult<()> {
        let internal_id = self.identity.internal_id()?;
        let at = now();

        match self.repository.find_worker(&self.worker_name, internal_id).await? {
            None => {
                self.repository.insert_worker(WorkerDetails::started(&self.worker_name, internal_id, at)).await?;
                info!(worker_name = %self.worker_name, internal_id = %internal_id, "Worker registered");
            }
            Some(_) => {
                self.repository.touch_worker(&self.worker_name, internal_id, at).await?;
                info!(worker_name = %self.worker_name, internal_id = %internal_id, "Worker restarted");
            }
        }
        Ok(())
    }

    /// Record a progress message and refresh the heartbeat.
    ///
    /// Fails if the row cannot be updated, including when the worker was never
    /// started. Callers usually log the error and carry on.
    pub async fn set_worker_progress(&self, progress: impl Into<WorkerProgress>) -> QueueResult<()> {
        let progress = progress.into();
        let internal_id = self.identity.internal_id()?;

        let matched =
            self.repository.set_progress(&self.worker_name, internal_id, now(), progress.message.clone()).await?;
        if matched == 0 {
            return Err(DatabaseError::NoUpdateFound(format!(
                "No worker details for worker {} with internal id {}",
                self.worker_name, internal_id
            ))
            .into());
        }

        debug!(worker_name = %self.worker_name, progress = %progress.message, "Worker progress recorded");
        Ok(())
    }
}
