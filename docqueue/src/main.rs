use clap::Parser as _;
use docqueue::cli::{Cli, Commands, ConsumeCmd, PublishCmd, SetupCmd};
use docqueue::config::{PublisherConfig, SubscriberConfig, WorkerConfig};
use docqueue::core::client::database::{
    MongoQueueRepository, MongoWorkerDetailsRepository, QueueRepository, WorkerDetailsRepository,
};
use docqueue::core::client::MongoClient;
use docqueue::error::{QueueServiceError, QueueServiceResult};
use docqueue::subscriber::{Delivery, MessageHandler};
use docqueue::utils::logging::init_logging;
use docqueue::utils::signal_handler::SignalHandler;
use docqueue::{Publisher, Subscriber, WorkerLifecycle};
use dotenvy::dotenv;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let (name, result) = match &cli.command {
        Commands::Setup { setup_command } => {
            debug!("Executing setup command with args: {:?}", setup_command);
            ("setup", setup_queue(setup_command).await)
        }
        Commands::Publish { publish_command } => {
            debug!("Executing publish command with args: {:?}", publish_command);
            ("publish", publish_message(publish_command).await)
        }
        Commands::Consume { consume_command } => {
            debug!("Executing consume command with args: {:?}", consume_command);
            ("consume", consume_messages(consume_command).await)
        }
    };

    match result {
        Ok(()) => info!(command = name, "Command completed successfully"),
        Err(e) => {
            error!(command = name, error = %e, error_chain = ?e, "Command failed");
            panic!("docqueue {} failed: {}", name, e);
        }
    }
}

async fn setup_queue(setup_cmd: &SetupCmd) -> QueueServiceResult<()> {
    let config = setup_cmd.config()?;
    info!(queue = %config.queue, database = %config.database.database_name, "Setting up docqueue");

    let client = Arc::new(MongoClient::new(&config.database.connection_url, &config.database.database_name).await?);
    client.health_check().await?;

    MongoQueueRepository::new(client.clone(), config.queue.clone())
        .ensure_indexes()
        .await
        .map_err(|e| QueueServiceError::SetupCommandError(format!("Failed to create queue indexes: {}", e)))?;
    MongoWorkerDetailsRepository::new(client)
        .ensure_indexes()
        .await
        .map_err(|e| QueueServiceError::SetupCommandError(format!("Failed to create worker indexes: {}", e)))?;

    Ok(())
}

async fn publish_message(publish_cmd: &PublishCmd) -> QueueServiceResult<()> {
    let config = PublisherConfig::try_from(publish_cmd)?;
    let publisher = Publisher::connect(&config).await?;

    if publish_cmd.raw {
        publisher.send_raw(publish_cmd.payload.clone(), publish_cmd.priority).await?;
    } else {
        let value: serde_json::Value = serde_json::from_str(&publish_cmd.payload)
            .map_err(|e| QueueServiceError::PublishCommandError(format!("Payload is not valid JSON: {}", e)))?;
        publisher.send(&value, publish_cmd.priority).await?;
    }

    info!(queue = %config.queue, priority = publish_cmd.priority, "Message published");
    Ok(())
}

/// Logs each payload and reports the running delivery count.
struct LoggingHandler {
    delivered: AtomicU64,
    progress_every: u64,
    progress_tx: mpsc::UnboundedSender<u64>,
}

#[async_trait::async_trait]
impl MessageHandler<serde_json::Value> for LoggingHandler {
    async fn handle(&self, delivery: &mut Delivery<serde_json::Value>) {
        info!(
            message_id = %delivery.message_id(),
            priority = delivery.priority(),
            payload = %delivery.payload,
            "Received message"
        );
        delivery.mark_succeeded();

        let delivered = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        if self.progress_every > 0 && delivered % self.progress_every == 0 {
            // The receiver is gone only once consume is shutting down.
            let _ = self.progress_tx.send(delivered);
        }
    }
}

async fn consume_messages(consume_cmd: &ConsumeCmd) -> QueueServiceResult<()> {
    let subscriber_config = SubscriberConfig::try_from(consume_cmd)?;
    let worker_config = WorkerConfig::try_from(consume_cmd)?;

    let lifecycle = WorkerLifecycle::connect(&worker_config).await?;
    lifecycle.start_worker().await?;

    let subscriber = Subscriber::connect(&subscriber_config).await?;

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let handler = LoggingHandler { delivered: AtomicU64::new(0), progress_every: consume_cmd.progress_every, progress_tx };

    let token = CancellationToken::new();
    let subscription = subscriber.subscribe::<serde_json::Value, _>(handler, token.clone());

    let mut signal_handler = SignalHandler::new();
    let shutdown_trigger = signal_handler.get_shutdown_trigger();

    // Heartbeats run beside the subscription; a finished subscription triggers shutdown.
    let reporter_token = token.clone();
    let reporter = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = reporter_token.cancelled() => break,
                delivered = progress_rx.recv() => {
                    let Some(delivered) = delivered else {
                        shutdown_trigger.notify_one();
                        break;
                    };
                    if let Err(e) = lifecycle.set_worker_progress(format!("Delivered {} messages", delivered)).await {
                        warn!(error = %e, "Failed to record worker progress");
                    }
                }
            }
        }
    });

    let signal = signal_handler.wait_for_shutdown().await?;
    info!(signal = %signal, worker_name = %subscription.worker_name(), "Stopping consumer");
    if subscription.is_finished() {
        warn!(worker_name = %subscription.worker_name(), "Subscription had already stopped");
    }
    token.cancel();

    signal_handler
        .handle_graceful_shutdown(
            || async move {
                let joined = subscription.join().await;
                if let Err(e) = reporter.await {
                    warn!(error = %e, "Progress reporter task failed");
                }
                joined.map_err(anyhow::Error::from)
            },
            consume_cmd.shutdown_timeout,
        )
        .await
        .map_err(|e| QueueServiceError::ConsumeCommandError(e.to_string()))
}
