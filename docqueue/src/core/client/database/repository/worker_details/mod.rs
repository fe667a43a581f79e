mod memory;
mod mongo;
mod r#trait;

pub use memory::InMemoryWorkerDetailsRepository;
pub use mongo::MongoWorkerDetailsRepository;
pub use r#trait::WorkerDetailsRepository;

#[cfg(test)]
pub use r#trait::MockWorkerDetailsRepository;
