use thiserror::Error;

use crate::core::client::database::DatabaseError;
use crate::core::error::QueueError;

/// Result type for service-level operations
pub type QueueServiceResult<T> = Result<T, QueueServiceError>;

/// Error types for the docqueue binary and setup flows
#[derive(Error, Debug)]
pub enum QueueServiceError {
    #[error("Queue error: {0}")]
    QueueError(#[from] QueueError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Setup Command error
    #[error("Setup Command Error: {0}")]
    SetupCommandError(String),

    /// Publish Command error
    #[error("Publish Command Error: {0}")]
    PublishCommandError(String),

    /// Consume Command error
    #[error("Consume Command Error: {0}")]
    ConsumeCommandError(String),

    #[error("Service Error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
