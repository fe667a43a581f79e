pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod publisher;
pub mod subscriber;
pub mod types;
pub mod utils;
pub mod worker;


// Re-export commonly used items
pub use crate::core::error::{QueueError, QueueResult};
pub use error::{QueueServiceError, QueueServiceResult};
pub use publisher::Publisher;
pub use subscriber::{handler_fn, Delivery, MessageHandler, Subscriber, Subscription, TickOutcome};
pub use types::codec::{JsonCodec, PayloadCodec};
pub use types::message::QueueMessage;
pub use worker::lifecycle::{WorkerLifecycle, WorkerProgress};
