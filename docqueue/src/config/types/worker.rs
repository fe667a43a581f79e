use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::database::DatabaseConfig;
use crate::core::error::{QueueError, QueueResult};

pub const DEFAULT_IDENTITY_FILE: &str = "worker_internal_id";

/// `worker:` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSection {
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self { identity_file: default_identity_file() }
    }
}

/// Validated worker lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub worker_name: String,
    pub identity_file: PathBuf,
}

impl WorkerConfig {
    pub fn new(database: DatabaseConfig, worker_name: impl Into<String>, identity_file: PathBuf) -> QueueResult<Self> {
        let config = Self { database, worker_name: worker_name.into(), identity_file };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueueResult<()> {
        self.database.validate()?;
        if self.worker_name.trim().is_empty() {
            return Err(QueueError::Configuration("worker name must not be empty".to_string()));
        }
        if self.identity_file.as_os_str().is_empty() {
            return Err(QueueError::Configuration("identity file path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_identity_file() -> PathBuf {
    PathBuf::from(DEFAULT_IDENTITY_FILE)
}
