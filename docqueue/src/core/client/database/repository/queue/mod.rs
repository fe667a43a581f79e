mod memory;
mod mongo;
mod r#trait;

pub use memory::InMemoryQueueRepository;
pub use mongo::MongoQueueRepository;
pub use r#trait::QueueRepository;

#[cfg(test)]
pub use r#trait::MockQueueRepository;
