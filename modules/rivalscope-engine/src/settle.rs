//! Fault-tolerant join helpers.
//!
//! Every provider call runs under its own deadline and settles to an
//! Option: a failure or timeout degrades that one call to None and is
//! logged, it never cancels or fails sibling calls.

use std::future::Future;
use std::time::Duration;

use futures::future;
use tracing::warn;

/// Default deadline for a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Run one fallible future under a deadline. Errors and timeouts resolve to
/// None; the caller substitutes an empty value for that field.
pub async fn guard<T, F>(label: &str, deadline: Duration, fut: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(task = label, error = %e, "Provider call failed, degrading to empty");
            None
        }
        Err(_) => {
            warn!(
                task = label,
                timeout_ms = deadline.as_millis() as u64,
                "Provider call timed out, degrading to empty"
            );
            None
        }
    }
}

/// Settle a batch of independent tasks. All tasks run concurrently, each
/// under its own deadline; the result preserves input order with None in
/// failed slots.
pub async fn settle_all<T, F>(label: &str, deadline: Duration, tasks: Vec<F>) -> Vec<Option<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    future::join_all(tasks.into_iter().enumerate().map(|(i, fut)| {
        let task_label = format!("{label}[{i}]");
        async move { guard(&task_label, deadline, fut).await }
    }))
    .await
}
