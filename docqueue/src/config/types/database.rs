use serde::{Deserialize, Serialize};

use crate::core::error::{QueueError, QueueResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_url: String,

    #[serde(default = "default_db_name")]
    pub database_name: String,
}

impl DatabaseConfig {
    pub fn new(connection_url: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self { connection_url: connection_url.into(), database_name: database_name.into() }
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.connection_url.trim().is_empty() {
            return Err(QueueError::Configuration("database connection url must not be empty".to_string()));
        }
        if self.database_name.trim().is_empty() {
            return Err(QueueError::Configuration("database name must not be empty".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn default_db_name() -> String {
    "docqueue".to_string()
}
