use assert_matches::assert_matches;
use clap::Parser;
use rstest::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::cli::{Cli, Commands};
use crate::config::{PublisherConfig, SubscriberConfig, WorkerConfig};
use crate::core::error::QueueError;
use crate::error::QueueServiceError;

fn parse(args: &[&str]) -> Commands {
    let mut argv = vec!["docqueue"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("arguments should parse").command
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[rstest]
fn consume_args_build_validated_configs() {
    let Commands::Consume { consume_command } = parse(&[
        "consume",
        "--mongodb-connection-url",
        "mongodb://localhost:27017",
        "--mongodb-database-name",
        "jobs_db",
        "--queue",
        "jobs",
        "--worker-name",
        "worker-7",
        "--delete-on-acknowledge",
        "--poll-interval-ms",
        "250",
        "--identity-file",
        "/tmp/docqueue/id",
    ]) else {
        panic!("expected the consume command");
    };

    let subscriber = SubscriberConfig::try_from(&*consume_command).unwrap();
    assert_eq!(subscriber.database.connection_url, "mongodb://localhost:27017");
    assert_eq!(subscriber.database.database_name, "jobs_db");
    assert_eq!(subscriber.queue, "jobs");
    assert_eq!(subscriber.worker_name, "worker-7");
    assert!(subscriber.delete_on_acknowledge);
    assert_eq!(subscriber.poll_interval, Duration::from_millis(250));

    let worker = WorkerConfig::try_from(&*consume_command).unwrap();
    assert_eq!(worker.worker_name, "worker-7");
    assert_eq!(worker.identity_file, std::path::PathBuf::from("/tmp/docqueue/id"));
}

#[rstest]
fn consume_without_worker_name_is_rejected() {
    let Commands::Consume { consume_command } =
        parse(&["consume", "--mongodb-connection-url", "mongodb://localhost:27017"])
    else {
        panic!("expected the consume command");
    };

    assert_matches!(
        SubscriberConfig::try_from(&*consume_command),
        Err(QueueServiceError::QueueError(QueueError::Configuration(_)))
    );
}

#[rstest]
fn publish_without_connection_url_is_rejected() {
    let Commands::Publish { publish_command } = parse(&["publish", "--payload", "{}"]) else {
        panic!("expected the publish command");
    };

    assert_matches!(PublisherConfig::try_from(&*publish_command), Err(QueueServiceError::ConfigError(_)));
}

#[rstest]
fn publish_rejects_zero_pool_size() {
    let Commands::Publish { publish_command } = parse(&[
        "publish",
        "--mongodb-connection-url",
        "mongodb://localhost:27017",
        "--max-pool-size",
        "0",
        "--payload",
        "{}",
    ]) else {
        panic!("expected the publish command");
    };

    assert_matches!(
        PublisherConfig::try_from(&*publish_command),
        Err(QueueServiceError::QueueError(QueueError::Configuration(_)))
    );
}

#[rstest]
fn publish_accepts_negative_priority() {
    let Commands::Publish { publish_command } = parse(&["publish", "--payload", "hello", "--raw", "--priority", "-5"])
    else {
        panic!("expected the publish command");
    };

    assert!(publish_command.raw);
    assert_eq!(publish_command.priority, -5);
}

/// Values from the command line take precedence over the config file.
#[rstest]
fn cli_overrides_config_file() {
    let file = config_file(
        r#"
config_version: "1"
database:
  connection_url: mongodb://from-file:27017
  database_name: file_db
queue: file_queue
publisher:
  max_pool_size: 20
subscriber:
  worker_name: file-worker
  poll_interval_ms: 500
"#,
    );
    let path = file.path().to_str().unwrap();

    let Commands::Consume { consume_command } = parse(&["consume", "--config", path, "--queue", "cli_queue"]) else {
        panic!("expected the consume command");
    };
    let subscriber = SubscriberConfig::try_from(&*consume_command).unwrap();
    assert_eq!(subscriber.database.connection_url, "mongodb://from-file:27017");
    assert_eq!(subscriber.database.database_name, "file_db");
    assert_eq!(subscriber.queue, "cli_queue");
    assert_eq!(subscriber.worker_name, "file-worker");
    assert_eq!(subscriber.poll_interval, Duration::from_millis(500));

    let Commands::Publish { publish_command } = parse(&["publish", "--config", path, "--payload", "{}"]) else {
        panic!("expected the publish command");
    };
    let publisher = PublisherConfig::try_from(&*publish_command).unwrap();
    assert_eq!(publisher.max_pool_size, 20);
    assert_eq!(publisher.queue, "file_queue");
}

#[rstest]
fn unversioned_config_file_is_rejected() {
    let file = config_file("database:\n  connection_url: mongodb://localhost:27017\n");
    let path = file.path().to_str().unwrap();

    let Commands::Setup { setup_command } = parse(&["setup", "--config", path]) else {
        panic!("expected the setup command");
    };
    assert_matches!(setup_command.config(), Err(QueueServiceError::AnyhowError(_)));
}
