pub mod queue;
pub mod worker_details;
