use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Counting gate bounding how many store calls are outstanding at once.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Half of the connection pool, never less than one slot.
    pub fn for_pool_size(pool_size: u32) -> Self {
        Self::new((pool_size / 2) as usize)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot, run `operation`, then free the slot.
    ///
    /// The permit is dropped on every exit path, including errors and
    /// cancellation of the returned future.
    pub async fn run<F, T>(&self, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        // acquire only fails on a closed semaphore and this one is never closed
        let _permit = self.semaphore.acquire().await.ok();
        operation.await
    }
}
