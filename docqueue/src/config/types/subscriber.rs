use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::database::DatabaseConfig;
use crate::core::error::{QueueError, QueueResult};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// `subscriber:` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberSection {
    #[serde(default)]
    pub worker_name: Option<String>,

    #[serde(default)]
    pub delete_on_acknowledge: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SubscriberSection {
    fn default() -> Self {
        Self { worker_name: None, delete_on_acknowledge: false, poll_interval_ms: DEFAULT_POLL_INTERVAL_MS }
    }
}

/// Validated subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    pub database: DatabaseConfig,
    pub queue: String,
    pub worker_name: String,
    pub delete_on_acknowledge: bool,
    pub poll_interval: Duration,
}

impl SubscriberConfig {
    pub fn new(database: DatabaseConfig, queue: impl Into<String>, worker_name: impl Into<String>) -> QueueResult<Self> {
        let config = Self {
            database,
            queue: queue.into(),
            worker_name: worker_name.into(),
            delete_on_acknowledge: false,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_delete_on_acknowledge(mut self, delete_on_acknowledge: bool) -> Self {
        self.delete_on_acknowledge = delete_on_acknowledge;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        self.database.validate()?;
        if self.queue.trim().is_empty() {
            return Err(QueueError::Configuration("queue name must not be empty".to_string()));
        }
        // An empty claimant is how unclaimed rows are marked, so it can never name a worker.
        if self.worker_name.trim().is_empty() {
            return Err(QueueError::Configuration("worker name must not be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(QueueError::Configuration("poll interval must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
