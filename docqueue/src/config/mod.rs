pub mod types;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::client::database::constant::DEFAULT_QUEUE_COLLECTION;
use crate::core::error::{QueueError, QueueResult};
pub use types::*;

/// Versioned configuration wrapper
/// This allows us to evolve the config format over time while maintaining backward compatibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "config_version")]
pub enum DocqueueConfigVersioned {
    #[serde(rename = "1")]
    V1(DocqueueConfigV1),
}

impl DocqueueConfigVersioned {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml_value: serde_yaml::Value = serde_yaml::from_str(content).context("Failed to parse YAML")?;

        if yaml_value.get("config_version").is_none() {
            anyhow::bail!(
                "Missing required field 'config_version' in config file. \
                 Current supported version: 1"
            );
        }

        let versioned: DocqueueConfigVersioned =
            serde_yaml::from_str(content).context("Failed to deserialize config")?;

        Ok(versioned)
    }

    /// Convert to the canonical (latest) config format
    pub fn into_canonical(self) -> DocqueueConfig {
        match self {
            DocqueueConfigVersioned::V1(v1) => v1,
        }
    }
}

/// Canonical configuration (always latest version internally)
pub type DocqueueConfig = DocqueueConfigV1;

/// Version 1 of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocqueueConfigV1 {
    pub database: DatabaseConfig,

    #[serde(default = "default_queue")]
    pub queue: String,

    #[serde(default)]
    pub publisher: PublisherSection,

    #[serde(default)]
    pub subscriber: SubscriberSection,

    #[serde(default)]
    pub worker: WorkerSection,
}

impl DocqueueConfigV1 {
    pub fn publisher_config(&self) -> QueueResult<PublisherConfig> {
        PublisherConfig::new(self.database.clone(), self.queue.clone(), self.publisher.max_pool_size)
    }

    pub fn subscriber_config(&self) -> QueueResult<SubscriberConfig> {
        let worker_name = self.worker_name()?;
        let config = SubscriberConfig::new(self.database.clone(), self.queue.clone(), worker_name)?
            .with_delete_on_acknowledge(self.subscriber.delete_on_acknowledge)
            .with_poll_interval(Duration::from_millis(self.subscriber.poll_interval_ms));
        config.validate()?;
        Ok(config)
    }

    pub fn worker_config(&self) -> QueueResult<WorkerConfig> {
        WorkerConfig::new(self.database.clone(), self.worker_name()?, self.worker.identity_file.clone())
    }

    fn worker_name(&self) -> QueueResult<String> {
        self.subscriber
            .worker_name
            .clone()
            .ok_or_else(|| QueueError::Configuration("worker name is required".to_string()))
    }
}

fn default_queue() -> String {
    DEFAULT_QUEUE_COLLECTION.to_string()
}
