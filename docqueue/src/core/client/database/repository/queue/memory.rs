use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::r#trait::QueueRepository;
use crate::core::client::database::error::DatabaseError;
use crate::types::message::{now, QueueMessage, UNCLAIMED};

#[derive(Default)]
struct QueueState {
    /// Rows in insertion order, which doubles as the `_id` tie-break.
    messages: Vec<QueueMessage>,
    failing_claims: usize,
}

/// Queue collection kept in process memory.
///
/// Each operation runs under a single lock from filter to mutation, which gives
/// `claim_next` the same all-or-nothing behaviour as the server-side
/// findOneAndUpdate. An optional insert delay keeps inserts outstanding long
/// enough for callers to observe publisher throttling.
#[derive(Default)]
pub struct InMemoryQueueRepository {
    state: Mutex<QueueState>,
    insert_delay: Option<Duration>,
    inserts_in_flight: AtomicUsize,
    max_inserts_in_flight: AtomicUsize,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Make the next `count` claim attempts fail with a transient error.
    pub fn fail_next_claims(&self, count: usize) {
        self.lock().failing_claims = count;
    }

    /// Highest number of inserts that were running at the same time.
    pub fn max_inserts_in_flight(&self) -> usize {
        self.max_inserts_in_flight.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<QueueMessage> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn oldest_position<F>(messages: &[QueueMessage], predicate: F) -> Option<usize>
    where
        F: Fn(&QueueMessage) -> bool,
    {
        messages
            .iter()
            .enumerate()
            .filter(|(_, message)| predicate(*message))
            .min_by_key(|(position, message)| (message.last_changed, *position))
            .map(|(position, _)| position)
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn insert_message(&self, message: QueueMessage) -> Result<(), DatabaseError> {
        let in_flight = self.inserts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inserts_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }

        self.lock().messages.push(message);
        self.inserts_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_claimed_by(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError> {
        let state = self.lock();
        Ok(Self::oldest_position(&state.messages, |m| m.claimant == worker_name)
            .map(|position| state.messages[position].clone()))
    }

    async fn claim_next(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError> {
        let mut state = self.lock();
        if state.failing_claims > 0 {
            state.failing_claims -= 1;
            return Err(DatabaseError::Unavailable("injected claim failure".to_string()));
        }

        let Some(position) = Self::oldest_position(&state.messages, QueueMessage::is_pending) else {
            return Ok(None);
        };

        let message = &mut state.messages[position];
        message.claimant = worker_name.to_string();
        message.last_changed = now();
        Ok(Some(message.clone()))
    }

    async fn delete_claimed(&self, worker_name: &str) -> Result<u64, DatabaseError> {
        let mut state = self.lock();
        match Self::oldest_position(&state.messages, |m| m.claimant == worker_name) {
            Some(position) => {
                state.messages.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn release_claimed(
        &self,
        worker_name: &str,
        payload: String,
        processed: bool,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut state = self.lock();
        let Some(position) = Self::oldest_position(&state.messages, |m| m.claimant == worker_name) else {
            return Ok(0);
        };

        let message = &mut state.messages[position];
        message.claimant = UNCLAIMED.to_string();
        message.processed = processed;
        message.last_changed = at;
        message.payload = payload;
        Ok(1)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<QueueMessage>, DatabaseError> {
        Ok(self.lock().messages.iter().find(|m| m.id == id).cloned())
    }

    async fn count_pending(&self) -> Result<u64, DatabaseError> {
        Ok(self.lock().messages.iter().filter(|m| m.is_pending()).count() as u64)
    }
}
