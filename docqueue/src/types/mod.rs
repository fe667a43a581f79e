pub mod codec;
pub mod message;
pub mod worker_details;

pub use message::QueueMessage;
pub use worker_details::{WorkerDetails, WorkerProgress};
