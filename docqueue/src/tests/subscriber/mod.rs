use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::future::join_all;
use mongodb::bson::oid::ObjectId;
use rstest::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::client::database::repository::queue::MockQueueRepository;
use crate::core::client::database::{DatabaseError, InMemoryQueueRepository, QueueRepository};
use crate::core::error::QueueError;
use crate::publisher::Publisher;
use crate::subscriber::{handler_fn, Delivery, MessageHandler, Subscriber, TickOutcome};
use crate::tests::common::{build_subscriber, decode_job, job_message, queue_repository, subscriber_config, Job};
use crate::types::message::{now, QueueMessage};

fn succeed(delivery: &mut Delivery<Job>) {
    delivery.mark_succeeded();
}

fn fail_and_count_attempt(delivery: &mut Delivery<Job>) {
    delivery.payload.attempts += 1;
    delivery.mark_failed();
}

async fn publish_jobs(repository: &Arc<InMemoryQueueRepository>, ids: impl IntoIterator<Item = u32>) {
    let publisher = Publisher::new(repository.clone(), 10);
    for id in ids {
        publisher.send(&Job::new(id), 0).await.unwrap();
    }
}

#[rstest]
#[tokio::test]
async fn empty_queue_yields_empty_tick(queue_repository: Arc<InMemoryQueueRepository>) {
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_eq!(outcome, TickOutcome::Empty);
}

/// One pending message, many workers polling at once: exactly one gets it.
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_worker_claims_a_message(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;

    let polls = (0..8).map(|i| {
        let subscriber = build_subscriber(&queue_repository, &format!("worker-{}", i), false);
        tokio::spawn(async move { subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await })
    });
    let outcomes: Vec<TickOutcome> = join_all(polls).await.into_iter().map(|r| r.unwrap().unwrap()).collect();

    let delivered = outcomes.iter().filter(|o| matches!(o, TickOutcome::Delivered { .. })).count();
    let empty = outcomes.iter().filter(|o| matches!(o, TickOutcome::Empty)).count();
    assert_eq!(delivered, 1);
    assert_eq!(empty, 7);
}

/// Workers draining a shared queue see every message exactly once.
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_drain_queue_without_duplicates(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, 0..40).await;

    let workers = (0..4).map(|i| {
        let subscriber = build_subscriber(&queue_repository, &format!("worker-{}", i), true);
        tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                match subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap() {
                    TickOutcome::Delivered { message_id, .. } => seen.push(message_id),
                    TickOutcome::Empty => break,
                    other => panic!("unexpected tick outcome: {:?}", other),
                }
            }
            seen
        })
    });

    let all: Vec<ObjectId> = join_all(workers).await.into_iter().flat_map(|r| r.unwrap()).collect();
    let unique: HashSet<ObjectId> = all.iter().copied().collect();
    assert_eq!(all.len(), 40);
    assert_eq!(unique.len(), 40);
    assert!(queue_repository.messages().is_empty());
}

/// A worker holding an unacknowledged message does not claim another one.
#[rstest]
#[tokio::test]
async fn worker_with_message_in_flight_skips_tick(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1, 2]).await;
    let held = queue_repository.claim_next("worker-1").await.unwrap().unwrap();

    let subscriber = build_subscriber(&queue_repository, "worker-1", true);
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();

    assert_eq!(outcome, TickOutcome::InFlight { message_id: held.id });
    assert_eq!(queue_repository.count_pending().await.unwrap(), 1);
}

#[rstest]
#[tokio::test]
async fn messages_are_delivered_oldest_first(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1, 2, 3]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = handler_fn(move |delivery: &mut Delivery<Job>| {
        let _ = tx.send(delivery.payload.id);
        delivery.mark_succeeded();
    });
    for _ in 0..3 {
        assert_matches!(subscriber.poll_once::<Job, _>(&handler).await, Ok(TickOutcome::Delivered { .. }));
    }

    let mut order = Vec::new();
    while let Ok(id) = rx.try_recv() {
        order.push(id);
    }
    assert_eq!(order, vec![1, 2, 3]);
}

/// Order follows `last_changed`, not the order rows were written in.
#[rstest]
#[tokio::test]
async fn older_last_changed_is_claimed_first(queue_repository: Arc<InMemoryQueueRepository>) {
    let mut newer = job_message(&Job::new(2));
    newer.last_changed = now() + chrono::Duration::seconds(5);
    let older = job_message(&Job::new(1));
    queue_repository.insert_message(newer).await.unwrap();
    queue_repository.insert_message(older).await.unwrap();

    let subscriber = build_subscriber(&queue_repository, "worker-1", true);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = handler_fn(move |delivery: &mut Delivery<Job>| {
        let _ = tx.send(delivery.payload.id);
        delivery.mark_succeeded();
    });
    for _ in 0..2 {
        assert_matches!(subscriber.poll_once::<Job, _>(&handler).await, Ok(TickOutcome::Delivered { .. }));
    }

    let mut order = Vec::new();
    while let Ok(id) = rx.try_recv() {
        order.push(id);
    }
    assert_eq!(order, vec![1, 2]);
}

#[rstest]
#[tokio::test]
async fn delete_mode_removes_processed_message(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();

    let TickOutcome::Delivered { message_id, processed, deleted } = outcome else {
        panic!("expected a delivery, got {:?}", outcome);
    };
    assert!(processed);
    assert!(deleted);
    assert!(queue_repository.find_by_id(message_id).await.unwrap().is_none());
}

/// A failed delivery in delete mode goes back to the queue with the handler's changes.
#[rstest]
#[tokio::test]
async fn delete_mode_requeues_failed_message(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    let before = queue_repository.messages()[0].clone();
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    tokio::time::sleep(Duration::from_millis(5)).await;
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(fail_and_count_attempt)).await.unwrap();
    assert_eq!(outcome, TickOutcome::Delivered { message_id: before.id, processed: false, deleted: false });

    let stored = queue_repository.find_by_id(before.id).await.unwrap().unwrap();
    assert!(stored.is_pending());
    assert_eq!(decode_job(&stored).attempts, 1);
    assert!(stored.last_changed > before.last_changed);

    // the requeued message is claimable again
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(fail_and_count_attempt)).await.unwrap();
    assert_matches!(outcome, TickOutcome::Delivered { processed: false, .. });
    let stored = queue_repository.find_by_id(before.id).await.unwrap().unwrap();
    assert_eq!(decode_job(&stored).attempts, 2);
}

#[rstest]
#[tokio::test]
async fn retain_mode_marks_message_processed(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", false);

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    let TickOutcome::Delivered { message_id, processed: true, deleted: false } = outcome else {
        panic!("expected a retained delivery, got {:?}", outcome);
    };

    let stored = queue_repository.find_by_id(message_id).await.unwrap().unwrap();
    assert!(stored.processed);
    assert_eq!(stored.claimant, "");

    // processed rows are never claimed again
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_eq!(outcome, TickOutcome::Empty);
}

#[rstest]
#[tokio::test]
async fn retain_mode_requeues_failed_message(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", false);

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(fail_and_count_attempt)).await.unwrap();
    let TickOutcome::Delivered { message_id, processed: false, deleted: false } = outcome else {
        panic!("expected a failed delivery, got {:?}", outcome);
    };

    let stored = queue_repository.find_by_id(message_id).await.unwrap().unwrap();
    assert!(stored.is_pending());
    assert_eq!(decode_job(&stored).attempts, 1);
}

/// A payload the consumer cannot decode stays claimed and stops the worker.
#[rstest]
#[tokio::test]
async fn undecodable_payload_stays_claimed(queue_repository: Arc<InMemoryQueueRepository>) {
    Publisher::new(queue_repository.clone(), 10).send_raw("{\"unexpected\": true}".to_string(), 0).await.unwrap();
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let result = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await;
    assert_matches!(result, Err(QueueError::Serialization(_)));

    let stored = queue_repository.messages();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_claimed_by("worker-1"));

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_eq!(outcome, TickOutcome::InFlight { message_id: stored[0].id });
}

#[rstest]
#[tokio::test]
async fn transient_claim_failure_is_retried_next_tick(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    queue_repository.fail_next_claims(1);
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_eq!(outcome, TickOutcome::StoreUnavailable);
    assert_eq!(queue_repository.count_pending().await.unwrap(), 1);

    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_matches!(outcome, TickOutcome::Delivered { processed: true, deleted: true, .. });
}

fn claimed_job_message(worker_name: &str) -> QueueMessage {
    let mut message = job_message(&Job::new(1));
    message.claimant = worker_name.to_string();
    message
}

#[rstest]
#[tokio::test]
async fn transient_in_flight_lookup_failure_is_swallowed() {
    let mut repository = MockQueueRepository::new();
    repository
        .expect_find_claimed_by()
        .times(1)
        .returning(|_| Err(DatabaseError::Unavailable("server selection timeout".to_string())));
    repository.expect_claim_next().never();

    let subscriber = Subscriber::new(Arc::new(repository), &subscriber_config("worker-1", true)).unwrap();
    let outcome = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await.unwrap();
    assert_eq!(outcome, TickOutcome::StoreUnavailable);
}

#[rstest]
#[tokio::test]
async fn non_transient_claim_failure_is_fatal() {
    let mut repository = MockQueueRepository::new();
    repository.expect_find_claimed_by().returning(|_| Ok(None));
    repository
        .expect_claim_next()
        .times(1)
        .returning(|_| Err(DatabaseError::FailedToDeserializeDocument("bad row".to_string())));

    let subscriber = Subscriber::new(Arc::new(repository), &subscriber_config("worker-1", true)).unwrap();
    let result = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await;
    assert_matches!(result, Err(QueueError::Store(DatabaseError::FailedToDeserializeDocument(_))));
}

fn io_failure() -> DatabaseError {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset by peer");
    DatabaseError::MongoError(mongodb::error::Error::from(io))
}

fn malformed_row() -> DatabaseError {
    let decode = mongodb::bson::from_bson::<String>(mongodb::bson::Bson::Int32(7)).unwrap_err();
    DatabaseError::MongoError(mongodb::error::Error::from(decode))
}

fn store_unavailable() -> DatabaseError {
    DatabaseError::Unavailable("server selection timeout".to_string())
}

fn no_update() -> DatabaseError {
    DatabaseError::NoUpdateFound("worker-1".to_string())
}

/// Driver I/O failures during the claim are retried; malformed rows are not.
#[rstest]
#[case::driver_io(io_failure, true)]
#[case::unavailable(store_unavailable, true)]
#[case::driver_decode(malformed_row, false)]
#[case::no_update(no_update, false)]
#[tokio::test]
async fn claim_failure_classification(#[case] failure: fn() -> DatabaseError, #[case] transient: bool) {
    assert_eq!(failure().is_transient(), transient);
    assert_eq!(QueueError::from(failure()).is_transient(), transient);

    let mut repository = MockQueueRepository::new();
    repository.expect_find_claimed_by().returning(|_| Ok(None));
    repository.expect_claim_next().times(1).returning(move |_| Err(failure()));

    let subscriber = Subscriber::new(Arc::new(repository), &subscriber_config("worker-1", true)).unwrap();
    let result = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await;

    if transient {
        assert_matches!(result, Ok(TickOutcome::StoreUnavailable));
    } else {
        assert_matches!(result, Err(QueueError::Store(_)));
    }
}

/// The claimed row vanished before the delete: acknowledgment fails.
#[rstest]
#[tokio::test]
async fn delete_of_missing_claim_fails_acknowledgment() {
    let message = claimed_job_message("worker-1");
    let mut repository = MockQueueRepository::new();
    repository.expect_find_claimed_by().returning(|_| Ok(None));
    repository.expect_claim_next().times(1).returning(move |_| Ok(Some(message.clone())));
    repository.expect_delete_claimed().times(1).returning(|_| Ok(0));

    let subscriber = Subscriber::new(Arc::new(repository), &subscriber_config("worker-1", true)).unwrap();
    let result = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await;

    assert_matches!(result, Err(QueueError::Acknowledge { worker_name }) if worker_name == "worker-1");
}

#[rstest]
#[tokio::test]
async fn release_of_missing_claim_fails_acknowledgment() {
    let message = claimed_job_message("worker-1");
    let mut repository = MockQueueRepository::new();
    repository.expect_find_claimed_by().returning(|_| Ok(None));
    repository.expect_claim_next().times(1).returning(move |_| Ok(Some(message.clone())));
    repository.expect_release_claimed().times(1).returning(|_, _, _, _| Ok(0));

    let subscriber = Subscriber::new(Arc::new(repository), &subscriber_config("worker-1", false)).unwrap();
    let result = subscriber.poll_once::<Job, _>(&handler_fn(succeed)).await;

    assert_matches!(result, Err(QueueError::Acknowledge { .. }));
}

/// Deleting twice for the same claim: the second acknowledgment has nothing to act on.
#[rstest]
#[tokio::test]
async fn second_delete_for_same_claim_matches_nothing(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    queue_repository.claim_next("worker-1").await.unwrap().unwrap();

    assert_eq!(queue_repository.delete_claimed("worker-1").await.unwrap(), 1);
    assert_eq!(queue_repository.delete_claimed("worker-1").await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn subscription_delivers_until_cancelled(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1, 2, 3]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = handler_fn(move |delivery: &mut Delivery<Job>| {
        let _ = tx.send(delivery.payload.clone());
        delivery.mark_succeeded();
    });

    let token = CancellationToken::new();
    let subscription = subscriber.subscribe::<Job, _>(handler, token.clone());
    assert_eq!(subscription.worker_name(), "worker-1");

    let mut received = Vec::new();
    for _ in 0..3 {
        let job = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        received.push(job.id);
    }
    assert_eq!(received, vec![1, 2, 3]);

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), subscription.join()).await.unwrap().unwrap();
    assert!(queue_repository.messages().is_empty());
}

#[rstest]
#[tokio::test]
async fn fatal_error_ends_subscription(queue_repository: Arc<InMemoryQueueRepository>) {
    Publisher::new(queue_repository.clone(), 10).send_raw("garbage".to_string(), 0).await.unwrap();
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let subscription = subscriber.subscribe::<Job, _>(handler_fn(succeed), CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(5), async {
        while !subscription.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    let result = subscription.join().await;

    assert_matches!(result, Err(QueueError::Serialization(_)));
}

#[rstest]
#[tokio::test]
async fn cancelled_subscription_never_polls(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let token = CancellationToken::new();
    token.cancel();
    let subscription = subscriber.subscribe::<Job, _>(handler_fn(succeed), token);
    tokio::time::timeout(Duration::from_secs(5), subscription.join()).await.unwrap().unwrap();

    assert_eq!(queue_repository.count_pending().await.unwrap(), 1);
}

/// Cancels the subscription from inside the handler, then finishes the work.
struct CancelWhileHandling {
    token: CancellationToken,
}

#[async_trait]
impl MessageHandler<Job> for CancelWhileHandling {
    async fn handle(&self, delivery: &mut Delivery<Job>) {
        self.token.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        delivery.set_processed_successfully(true);
    }
}

/// A tick in progress when the token fires still acknowledges its message.
#[rstest]
#[tokio::test]
async fn cancellation_mid_tick_completes_acknowledgment(queue_repository: Arc<InMemoryQueueRepository>) {
    publish_jobs(&queue_repository, [1, 2]).await;
    let subscriber = build_subscriber(&queue_repository, "worker-1", true);

    let token = CancellationToken::new();
    let handler = CancelWhileHandling { token: token.clone() };
    let subscription = subscriber.subscribe::<Job, _>(handler, token);

    let result = tokio::time::timeout(Duration::from_secs(5), subscription.join()).await.unwrap();
    assert_matches!(result, Ok(()));

    // the first job was deleted, no further tick claimed the second
    let remaining = queue_repository.messages();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].is_pending());
    assert_eq!(decode_job(&remaining[0]).id, 2);
}
