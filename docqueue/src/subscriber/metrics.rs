/// Subscriber metrics for monitoring the poll loop
///
/// Emitted as structured tracing events carrying a stable `metric` name so
/// log pipelines can count them without a separate metrics exporter.
use std::sync::LazyLock;
use tracing::{info, trace, warn};

/// Metric names for subscriber operations
pub struct SubscriberMetrics {
    /// Counter for successful claims
    pub claims_success: &'static str,
    /// Counter for ticks skipped because the worker still owns a message
    pub in_flight_skips: &'static str,
    /// Counter for empty poll cycles (nothing pending)
    pub empty_polls: &'static str,
    /// Counter for store failures swallowed by the poll loop
    pub transient_errors: &'static str,
    /// Counter for acknowledgments, tagged with the ack mode
    pub acknowledgments: &'static str,
}

pub static SUBSCRIBER_METRICS: LazyLock<SubscriberMetrics> = LazyLock::new(|| SubscriberMetrics {
    claims_success: "subscriber.claims.success",
    in_flight_skips: "subscriber.polls.in_flight",
    empty_polls: "subscriber.polls.empty",
    transient_errors: "subscriber.store.transient_errors",
    acknowledgments: "subscriber.acknowledgments",
});

pub fn record_claim_success(worker_name: &str, message_id: &str) {
    trace!(
        metric = SUBSCRIBER_METRICS.claims_success,
        worker_name = worker_name,
        message_id = message_id,
        "Message claimed"
    );
}

pub fn record_in_flight_skip(worker_name: &str, message_id: &str) {
    trace!(
        metric = SUBSCRIBER_METRICS.in_flight_skips,
        worker_name = worker_name,
        message_id = message_id,
        "Worker still owns an unacknowledged message, skipping claim"
    );
}

pub fn record_empty_poll(worker_name: &str) {
    trace!(metric = SUBSCRIBER_METRICS.empty_polls, worker_name = worker_name, "No pending messages to claim");
}

pub fn record_transient_error(worker_name: &str, operation: &str, error: &str) {
    warn!(
        metric = SUBSCRIBER_METRICS.transient_errors,
        worker_name = worker_name,
        operation = operation,
        error = error,
        "Store unavailable, retrying on next tick"
    );
}

pub fn record_acknowledgment(worker_name: &str, message_id: &str, processed: bool, deleted: bool) {
    info!(
        metric = SUBSCRIBER_METRICS.acknowledgments,
        worker_name = worker_name,
        message_id = message_id,
        processed,
        deleted,
        "Message acknowledged"
    );
}
