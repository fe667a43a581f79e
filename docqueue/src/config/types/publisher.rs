use serde::{Deserialize, Serialize};

use super::database::DatabaseConfig;
use crate::core::error::{QueueError, QueueResult};

/// Default capacity of the MongoDB driver connection pool.
pub const DEFAULT_MAX_POOL_SIZE: u32 = 10;

/// `publisher:` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherSection {
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self { max_pool_size: DEFAULT_MAX_POOL_SIZE }
    }
}

/// Validated publisher settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    pub database: DatabaseConfig,
    pub queue: String,
    /// Connection pool capacity; the admission gate gets half of it.
    pub max_pool_size: u32,
}

impl PublisherConfig {
    pub fn new(database: DatabaseConfig, queue: impl Into<String>, max_pool_size: u32) -> QueueResult<Self> {
        let config = Self { database, queue: queue.into(), max_pool_size };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueueResult<()> {
        self.database.validate()?;
        if self.queue.trim().is_empty() {
            return Err(QueueError::Configuration("queue name must not be empty".to_string()));
        }
        if self.max_pool_size == 0 {
            return Err(QueueError::Configuration("max pool size must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn default_max_pool_size() -> u32 {
    DEFAULT_MAX_POOL_SIZE
}
