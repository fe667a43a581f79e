/// Subscriber for a single worker identity
///
/// Polls the queue collection on a fixed interval. Each tick:
/// 1. skips if this worker still owns an unacknowledged message
/// 2. atomically claims the oldest pending message
/// 3. decodes it and hands it to the handler
/// 4. writes the outcome back (delete or retain) before the next tick
///
/// Mutual exclusion between workers rests entirely on the store's
/// find-and-update; nothing here takes an in-process lock.
mod handler;
pub mod metrics;

pub use handler::{handler_fn, Delivery, FnHandler, MessageHandler};

use mongodb::bson::oid::ObjectId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::SubscriberConfig;
use crate::core::client::database::{DatabaseError, MongoQueueRepository, QueueRepository};
use crate::core::client::MongoClient;
use crate::core::error::{QueueError, QueueResult};
use crate::types::codec::{JsonCodec, PayloadCodec};
use crate::types::message::{now, QueueMessage};

/// What a single poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The worker already owns `message_id`; nothing was claimed.
    InFlight { message_id: ObjectId },
    /// Nothing pending, or every pending row was taken by someone else first.
    Empty,
    /// A transient store failure; the tick is retried on the next interval.
    StoreUnavailable,
    /// A message was claimed, handled and acknowledged.
    Delivered { message_id: ObjectId, processed: bool, deleted: bool },
}

#[derive(Clone)]
pub struct Subscriber<C = JsonCodec> {
    repository: Arc<dyn QueueRepository>,
    worker_name: String,
    delete_on_acknowledge: bool,
    poll_interval: Duration,
    codec: C,
}

impl Subscriber<JsonCodec> {
    /// Create a subscriber over an existing repository.
    pub fn new(repository: Arc<dyn QueueRepository>, config: &SubscriberConfig) -> QueueResult<Self> {
        Self::with_codec(repository, config, JsonCodec)
    }

    /// Connect to MongoDB using validated settings and provision the queue indexes.
    pub async fn connect(config: &SubscriberConfig) -> QueueResult<Self> {
        config.validate()?;
        let client = MongoClient::new(&config.database.connection_url, &config.database.database_name).await?;
        let repository = MongoQueueRepository::new(Arc::new(client), config.queue.clone());
        repository.ensure_indexes().await?;

        info!(
            queue = %config.queue,
            worker_name = %config.worker_name,
            delete_on_acknowledge = config.delete_on_acknowledge,
            "Subscriber connected"
        );
        Self::new(Arc::new(repository), config)
    }
}

impl<C: PayloadCodec> Subscriber<C> {
    pub fn with_codec(repository: Arc<dyn QueueRepository>, config: &SubscriberConfig, codec: C) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            worker_name: config.worker_name.clone(),
            delete_on_acknowledge: config.delete_on_acknowledge,
            poll_interval: config.poll_interval,
            codec,
        })
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Run exactly one poll tick.
    ///
    /// Transient store failures before a message is claimed are reported as
    /// [`TickOutcome::StoreUnavailable`]. Everything else that goes wrong is
    /// returned as an error and leaves the message claimed by this worker.
    pub async fn poll_once<T, H>(&self, handler: &H) -> QueueResult<TickOutcome>
    where
        T: DeserializeOwned + Serialize + Send,
        H: MessageHandler<T> + ?Sized,
    {
        match self.repository.find_claimed_by(&self.worker_name).await {
            Ok(Some(message)) => {
                metrics::record_in_flight_skip(&self.worker_name, &message.id.to_hex());
                return Ok(TickOutcome::InFlight { message_id: message.id });
            }
            Ok(None) => {}
            Err(e) => return self.swallow_transient("find_claimed_by", e),
        }

        let message = match self.repository.claim_next(&self.worker_name).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                metrics::record_empty_poll(&self.worker_name);
                return Ok(TickOutcome::Empty);
            }
            Err(e) => return self.swallow_transient("claim_next", e),
        };

        metrics::record_claim_success(&self.worker_name, &message.id.to_hex());
        self.deliver::<T, H>(message, handler).await
    }

    fn swallow_transient(&self, operation: &str, error: DatabaseError) -> QueueResult<TickOutcome> {
        let error = QueueError::from(error);
        if error.is_transient() {
            metrics::record_transient_error(&self.worker_name, operation, &error.to_string());
            Ok(TickOutcome::StoreUnavailable)
        } else {
            Err(error)
        }
    }

    async fn deliver<T, H>(&self, message: QueueMessage, handler: &H) -> QueueResult<TickOutcome>
    where
        T: DeserializeOwned + Serialize + Send,
        H: MessageHandler<T> + ?Sized,
    {
        let payload: T = self.codec.decode(&message.payload).map_err(|e| {
            error!(
                worker_name = %self.worker_name,
                message_id = %message.id,
                error = %e,
                "Failed to decode claimed message, it stays claimed until manually recovered"
            );
            QueueError::Serialization(format!("Was not possible to process payload of message {}: {}", message.id, e))
        })?;

        debug!(
            worker_name = %self.worker_name,
            message_id = %message.id,
            priority = message.priority,
            "Delivering message"
        );

        let mut delivery = Delivery::new(message.id, message.priority, payload);
        handler.handle(&mut delivery).await;

        self.acknowledge(delivery).await
    }

    async fn acknowledge<T: Serialize>(&self, delivery: Delivery<T>) -> QueueResult<TickOutcome> {
        let message_id = delivery.message_id();
        let processed = delivery.processed_successfully();

        if self.delete_on_acknowledge && processed {
            let deleted = self.repository.delete_claimed(&self.worker_name).await?;
            if deleted == 0 {
                return Err(self.acknowledge_error(message_id));
            }
            metrics::record_acknowledgment(&self.worker_name, &message_id.to_hex(), true, true);
            return Ok(TickOutcome::Delivered { message_id, processed: true, deleted: true });
        }

        let payload = self.codec.encode(&delivery.payload).map_err(QueueError::Serialization)?;
        let matched = self.repository.release_claimed(&self.worker_name, payload, processed, now()).await?;
        if matched == 0 {
            return Err(self.acknowledge_error(message_id));
        }

        metrics::record_acknowledgment(&self.worker_name, &message_id.to_hex(), processed, false);
        Ok(TickOutcome::Delivered { message_id, processed, deleted: false })
    }

    fn acknowledge_error(&self, message_id: ObjectId) -> QueueError {
        error!(
            worker_name = %self.worker_name,
            message_id = %message_id,
            "Claimed message disappeared before it could be acknowledged"
        );
        QueueError::Acknowledge { worker_name: self.worker_name.clone() }
    }
}

impl<C: PayloadCodec + Clone> Subscriber<C> {
    /// Start polling in a background task until `token` is cancelled.
    ///
    /// Cancellation only stops future ticks: a tick that has already claimed a
    /// message runs through its acknowledgment first. A fatal error ends the
    /// loop and is returned from [`Subscription::join`].
    pub fn subscribe<T, H>(&self, handler: H, token: CancellationToken) -> Subscription
    where
        T: DeserializeOwned + Serialize + Send + 'static,
        H: MessageHandler<T> + 'static,
    {
        let subscriber = self.clone();
        let worker_name = self.worker_name.clone();
        let span = info_span!("subscriber", worker = %worker_name);
        let handle = tokio::spawn(async move { subscriber.run(handler, token).await }.instrument(span));

        Subscription { worker_name, handle }
    }

    async fn run<T, H>(self, handler: H, token: CancellationToken) -> QueueResult<()>
    where
        T: DeserializeOwned + Serialize + Send,
        H: MessageHandler<T>,
    {
        info!(
            worker_name = %self.worker_name,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            delete_on_acknowledge = self.delete_on_acknowledge,
            "Starting subscriber"
        );

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(worker_name = %self.worker_name, "Subscriber received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.poll_once::<T, H>(&handler).await {
                error!(
                    worker_name = %self.worker_name,
                    error = %e,
                    "Subscription terminated by fatal error"
                );
                return Err(e);
            }
        }

        info!(worker_name = %self.worker_name, "Subscriber stopped");
        Ok(())
    }
}

/// Handle to a running subscription.
pub struct Subscription {
    worker_name: String,
    handle: JoinHandle<QueueResult<()>>,
}

impl Subscription {
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the subscription to end.
    ///
    /// `Ok(())` after cancellation, `Err` with the fatal error otherwise.
    pub async fn join(self) -> QueueResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(QueueError::SubscriptionTask(e.to_string())),
        }
    }
}
