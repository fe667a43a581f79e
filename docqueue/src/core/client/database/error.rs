use mongodb::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Failed to serialize document: {0}")]
    FailedToSerializeDocument(String),

    #[error("Failed to deserialize document: {0}")]
    FailedToDeserializeDocument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("No document matched the update: {0}")]
    NoUpdateFound(String),

    #[error("Invalid connection settings: {0}")]
    InvalidConnectionSettings(String),
}

impl From<mongodb::bson::ser::Error> for DatabaseError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        DatabaseError::FailedToSerializeDocument(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for DatabaseError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        DatabaseError::FailedToDeserializeDocument(err.to_string())
    }
}

impl DatabaseError {
    /// Whether the failure is worth retrying on the next poll tick.
    ///
    /// Network failures, server selection timeouts and errors the driver labels
    /// as retryable are transient. Everything else (validation, auth, bad
    /// documents) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            DatabaseError::Unavailable(_) => true,
            DatabaseError::MongoError(err) => {
                matches!(*err.kind, ErrorKind::Io(_) | ErrorKind::ServerSelection { .. })
                    || err.contains_label("RetryableWriteError")
                    || err.contains_label("TransientTransactionError")
            }
            _ => false,
        }
    }
}
