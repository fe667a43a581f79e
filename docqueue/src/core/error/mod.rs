use super::client::database::DatabaseError;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    /// A payload could not be encoded for the store or decoded from it.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),

    /// The row this worker claimed was gone when the outcome was written back.
    #[error("Cannot acknowledge last operation from worker: {worker_name}")]
    Acknowledge { worker_name: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Worker identity error: {0}")]
    Identity(String),

    /// The task driving a subscription panicked or was aborted.
    #[error("Subscription task failed: {0}")]
    SubscriptionTask(String),
}

impl QueueError {
    /// Store failures that the poll loop may retry on its next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Store(e) if e.is_transient())
    }
}
