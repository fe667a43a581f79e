pub mod constant;
pub mod error;
pub mod mongo_client;
pub mod repository;

pub use error::DatabaseError;
pub use repository::queue::{InMemoryQueueRepository, MongoQueueRepository, QueueRepository};
pub use repository::worker_details::{
    InMemoryWorkerDetailsRepository, MongoWorkerDetailsRepository, WorkerDetailsRepository,
};
