/// Default name of the queue collection when none is configured.
pub const DEFAULT_QUEUE_COLLECTION: &str = "queue";

/// Collection holding one heartbeat row per (worker name, internal id) pair.
pub const WORKER_DETAILS_COLLECTION: &str = "worker_details";
