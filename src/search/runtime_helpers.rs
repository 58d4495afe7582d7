//! Retry helper for transient failures
//!
//! Only index-writer acquisition goes through here. Source store calls are
//! never retried in place; a failed refresh waits for the next timer tick.

use std::future::Future;

use super::errors::{RetryConfig, SearchResult};

/// Retry an operation with exponential backoff while its error is transient
///
/// Non-transient errors are returned immediately. After `max_attempts`
/// retries the last error is returned.
pub async fn retry_task<F, Fut, T>(config: RetryConfig, mut operation: F) -> SearchResult<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = SearchResult<T>> + Send,
    T: Send + 'static,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_transient() {
                    return Err(e);
                }

                if attempt >= config.max_attempts {
                    tracing::error!(
                        attempts = attempt + 1,
                        error = %e,
                        "Max retry attempts exceeded"
                    );
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                attempt += 1;

                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient error, retrying after delay"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
