//! # Bounded Retry
//!
//! Retry policy shared by the use-case layer (optimistic-version
//! conflicts) and the port adapters (upstream faults). Only kinds marked
//! retryable are retried; guard violations surface immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use aqar_core::{DomainError, DomainResult};

/// Default attempt budget, the first try included.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Base delay before the first retry; doubles per attempt, plus jitter.
const BASE_DELAY: Duration = Duration::from_millis(50);

/// Run `op` up to `attempts` times with exponential backoff and jitter.
///
/// Retries only errors whose kind is retryable (`CONFLICT`,
/// `UPSTREAM_UNAVAILABLE`). The final error is surfaced unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    op_name: &str,
    attempts: u32,
    mut op: F,
) -> DomainResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let mut last: Option<DomainError> = None;
    for attempt in 1..=attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind().is_retryable() && attempt < attempts => {
                let backoff = BASE_DELAY * 2u32.pow(attempt - 1);
                let jitter = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 2);
                let delay = backoff + Duration::from_millis(jitter);
                tracing::warn!(
                    op = op_name,
                    attempt,
                    kind = ?err.kind(),
                    delay_ms = delay.as_millis() as u64,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                last = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    // Reachable only when the loop exhausted its retryable attempts.
    Err(last.unwrap_or_else(|| {
        DomainError::UpstreamUnavailable(format!("{op_name}: retry budget exhausted"))
    }))
}
