use crate::core::client::database::error::DatabaseError;
use std::future::Future;
use std::time::Instant;

/// Time a store round-trip and emit it as a trace event tagged with the operation name.
pub async fn record_metrics<T, F, Fut>(operation: &'static str, f: F) -> Result<T, DatabaseError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    let start = Instant::now();
    let result = f().await;
    let duration = start.elapsed();

    match &result {
        Ok(_) => {
            tracing::trace!(
                db_operation_name = operation,
                duration_ms = duration.as_millis() as u64,
                category = "db_call",
                "Store operation completed"
            );
        }
        Err(e) => {
            tracing::debug!(
                db_operation_name = operation,
                duration_ms = duration.as_millis() as u64,
                error = %e,
                category = "db_call",
                "Store operation failed"
            );
        }
    }

    result
}
