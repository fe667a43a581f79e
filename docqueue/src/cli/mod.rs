use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::types::database::default_db_name;
use crate::config::{
    DatabaseConfig, DocqueueConfig, DocqueueConfigVersioned, PublisherConfig, PublisherSection, SubscriberConfig,
    SubscriberSection, WorkerConfig, WorkerSection,
};
use crate::core::client::database::constant::DEFAULT_QUEUE_COLLECTION;
use crate::error::{QueueServiceError, QueueServiceResult};

pub mod database;
pub mod queue;

use database::mongodb::MongoDBCliArgs;
use queue::QueueCliArgs;

#[derive(Parser, Debug)]
#[command(
    name = "docqueue",
    about = "Broker-less message queue on top of a shared MongoDB collection",
    after_help = "Examples:\n  \
    docqueue setup --mongodb-connection-url mongodb://localhost:27017\n  \
    docqueue publish --queue jobs --payload '{\"id\": 1}'\n  \
    docqueue consume --queue jobs --worker-name worker-1 --delete-on-acknowledge\n  \
    docqueue consume --config /path/to/docqueue.yaml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the indexes used by the queue and worker collections
    Setup {
        #[command(flatten)]
        setup_command: Box<SetupCmd>,
    },
    /// Publish one message
    Publish {
        #[command(flatten)]
        publish_command: Box<PublishCmd>,
    },
    /// Consume messages as a named worker until interrupted
    Consume {
        #[command(flatten)]
        consume_command: Box<ConsumeCmd>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct SetupCmd {
    /// Path to YAML configuration file
    #[arg(long = "config", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub mongodb_args: MongoDBCliArgs,

    #[clap(flatten)]
    pub queue_args: QueueCliArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct PublishCmd {
    /// Path to YAML configuration file
    #[arg(long = "config", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub mongodb_args: MongoDBCliArgs,

    #[clap(flatten)]
    pub queue_args: QueueCliArgs,

    /// Connection pool size; half of it bounds concurrent inserts.
    #[arg(env = "DOCQUEUE_MAX_POOL_SIZE", long)]
    pub max_pool_size: Option<u32>,

    /// Message payload. Parsed as JSON unless `--raw` is given.
    #[arg(long)]
    pub payload: String,

    /// Store the payload text as-is.
    #[arg(long, default_value_t = false)]
    pub raw: bool,

    /// Stored with the message; does not affect delivery order.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub priority: i32,
}

#[derive(Parser, Debug, Clone)]
pub struct ConsumeCmd {
    /// Path to YAML configuration file
    #[arg(long = "config", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub mongodb_args: MongoDBCliArgs,

    #[clap(flatten)]
    pub queue_args: QueueCliArgs,

    /// Worker identity used as the claimant of messages.
    #[arg(env = "DOCQUEUE_WORKER_NAME", long)]
    pub worker_name: Option<String>,

    /// Delete successfully processed messages instead of marking them processed.
    #[arg(env = "DOCQUEUE_DELETE_ON_ACKNOWLEDGE", long, default_value_t = false)]
    pub delete_on_acknowledge: bool,

    /// Time between two poll ticks.
    #[arg(env = "DOCQUEUE_POLL_INTERVAL_MS", long)]
    pub poll_interval_ms: Option<u64>,

    /// File holding this machine's worker internal id.
    #[arg(env = "DOCQUEUE_IDENTITY_FILE", long)]
    pub identity_file: Option<PathBuf>,

    /// Write a progress heartbeat after this many deliveries.
    #[arg(env = "DOCQUEUE_PROGRESS_EVERY", long, default_value_t = 100)]
    pub progress_every: u64,

    /// Seconds to wait for an in-flight tick on shutdown.
    #[arg(env = "DOCQUEUE_SHUTDOWN_TIMEOUT", long, default_value_t = 30)]
    pub shutdown_timeout: u64,
}

/// Build the configuration from an optional YAML file, with CLI values taking precedence.
pub fn load_config(
    config_file: Option<&PathBuf>,
    mongodb_args: &MongoDBCliArgs,
    queue_args: &QueueCliArgs,
) -> QueueServiceResult<DocqueueConfig> {
    let mut config = match config_file {
        Some(path) => DocqueueConfigVersioned::from_yaml_file(path)?.into_canonical(),
        None => {
            let connection_url = mongodb_args.connection_url.clone().ok_or_else(|| {
                QueueServiceError::ConfigError(
                    "MongoDB connection url is required, pass --mongodb-connection-url or --config".to_string(),
                )
            })?;
            DocqueueConfig {
                database: DatabaseConfig::new(connection_url, default_db_name()),
                queue: DEFAULT_QUEUE_COLLECTION.to_string(),
                publisher: PublisherSection::default(),
                subscriber: SubscriberSection::default(),
                worker: WorkerSection::default(),
            }
        }
    };

    if let Some(connection_url) = &mongodb_args.connection_url {
        config.database.connection_url = connection_url.clone();
    }
    if let Some(database_name) = &mongodb_args.database_name {
        config.database.database_name = database_name.clone();
    }
    if let Some(queue) = &queue_args.queue {
        config.queue = queue.clone();
    }

    Ok(config)
}

impl SetupCmd {
    pub fn config(&self) -> QueueServiceResult<DocqueueConfig> {
        let config = load_config(self.config_file.as_ref(), &self.mongodb_args, &self.queue_args)?;
        config.database.validate()?;
        Ok(config)
    }
}

impl PublishCmd {
    pub fn config(&self) -> QueueServiceResult<DocqueueConfig> {
        let mut config = load_config(self.config_file.as_ref(), &self.mongodb_args, &self.queue_args)?;
        if let Some(max_pool_size) = self.max_pool_size {
            config.publisher.max_pool_size = max_pool_size;
        }
        Ok(config)
    }
}

impl TryFrom<&PublishCmd> for PublisherConfig {
    type Error = QueueServiceError;

    fn try_from(cmd: &PublishCmd) -> Result<Self, Self::Error> {
        Ok(cmd.config()?.publisher_config()?)
    }
}

impl ConsumeCmd {
    pub fn config(&self) -> QueueServiceResult<DocqueueConfig> {
        let mut config = load_config(self.config_file.as_ref(), &self.mongodb_args, &self.queue_args)?;
        if let Some(worker_name) = &self.worker_name {
            config.subscriber.worker_name = Some(worker_name.clone());
        }
        if self.delete_on_acknowledge {
            config.subscriber.delete_on_acknowledge = true;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.subscriber.poll_interval_ms = poll_interval_ms;
        }
        if let Some(identity_file) = &self.identity_file {
            config.worker.identity_file = identity_file.clone();
        }
        Ok(config)
    }
}

impl TryFrom<&ConsumeCmd> for SubscriberConfig {
    type Error = QueueServiceError;

    fn try_from(cmd: &ConsumeCmd) -> Result<Self, Self::Error> {
        Ok(cmd.config()?.subscriber_config()?)
    }
}

impl TryFrom<&ConsumeCmd> for WorkerConfig {
    type Error = QueueServiceError;

    fn try_from(cmd: &ConsumeCmd) -> Result<Self, Self::Error> {
        Ok(cmd.config()?.worker_config()?)
    }
}
