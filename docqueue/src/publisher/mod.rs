//! Appends messages to the queue collection.
//!
//! Every send goes through an admission gate sized from the store connection
//! pool, so a single publisher never occupies more than half of the pool no
//! matter how many tasks call it at once.

mod throttle;

pub use throttle::AdmissionGate;

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PublisherConfig;
use crate::core::client::database::{MongoQueueRepository, QueueRepository};
use crate::core::client::MongoClient;
use crate::core::error::{QueueError, QueueResult};
use crate::types::codec::{JsonCodec, PayloadCodec};
use crate::types::message::QueueMessage;

pub struct Publisher<C = JsonCodec> {
    repository: Arc<dyn QueueRepository>,
    gate: AdmissionGate,
    codec: C,
}

impl Publisher<JsonCodec> {
    /// Create a publisher over an existing repository.
    ///
    /// `pool_size` is the store connection pool capacity; the gate admits half of it.
    pub fn new(repository: Arc<dyn QueueRepository>, pool_size: u32) -> Self {
        Self::with_codec(repository, pool_size, JsonCodec)
    }

    /// Connect to MongoDB using validated settings and provision the queue indexes.
    pub async fn connect(config: &PublisherConfig) -> QueueResult<Self> {
        config.validate()?;
        let client = MongoClient::with_pool_size(
            &config.database.connection_url,
            &config.database.database_name,
            Some(config.max_pool_size),
        )
        .await?;
        let repository = MongoQueueRepository::new(Arc::new(client), config.queue.clone());
        repository.ensure_indexes().await?;

        info!(
            queue = %config.queue,
            database = %config.database.database_name,
            max_pool_size = config.max_pool_size,
            "Publisher connected"
        );
        Ok(Self::new(Arc::new(repository), config.max_pool_size))
    }
}

impl<C: PayloadCodec> Publisher<C> {
    pub fn with_codec(repository: Arc<dyn QueueRepository>, pool_size: u32, codec: C) -> Self {
        Self { repository, gate: AdmissionGate::for_pool_size(pool_size), codec }
    }

    /// Encode `payload` and append it to the queue.
    pub async fn send<T: Serialize>(&self, payload: &T, priority: i32) -> QueueResult<()> {
        let encoded = self.codec.encode(payload).map_err(QueueError::Serialization)?;
        self.send_raw(encoded, priority).await
    }

    /// Append an already encoded payload to the queue.
    pub async fn send_raw(&self, payload: String, priority: i32) -> QueueResult<()> {
        let message = QueueMessage::new(payload, priority);
        let message_id = message.id;

        self.gate.run(self.repository.insert_message(message)).await?;

        debug!(message_id = %message_id, priority, "Message published");
        Ok(())
    }

    /// Free admission slots right now.
    pub fn available_slots(&self) -> usize {
        self.gate.available()
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }
}
