pub mod database;
pub mod publisher;
pub mod subscriber;
pub mod worker;

pub use database::DatabaseConfig;
pub use publisher::{PublisherConfig, PublisherSection};
pub use subscriber::{SubscriberConfig, SubscriberSection};
pub use worker::{WorkerConfig, WorkerSection};
