use crate::errors::{CatalogError, CatalogResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Backoff delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single backoff delay
    pub max_delay: Duration,
    /// Jitter fraction in [0, 1]; 0 makes the backoff deterministic
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based).
    ///
    /// Grows as `base_delay * 2^(attempt - 1)`, capped at `max_delay`,
    /// with up to `jitter * delay` of symmetric random noise. With
    /// `jitter == 0.0` the result is fully deterministic and
    /// non-decreasing in `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.saturating_sub(1) as i32);

        let jitter_range = base_ms * self.jitter;
        let jitter = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        let delay_ms = (base_ms + jitter)
            .clamp(0.0, self.max_delay.as_millis() as f64);

        Duration::from_millis(delay_ms as u64)
    }
}

/// Retry executor wrapping a single logical request with failure
/// classification and exponential backoff.
///
/// Fatal errors propagate on the first attempt. Retryable errors are
/// retried up to `max_retries` times, sleeping between attempts; once
/// exhausted the last failure is wrapped in
/// [`CatalogError::RetriesExhausted`] together with the attempt count.
/// The backoff sleep suspends only the calling task.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration this executor was built with
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute the given operation with retry logic.
    ///
    /// `operation` names the logical request for log context only;
    /// it is opaque to the executor.
    pub async fn execute<F, Fut, T>(&self, operation: &str, f: F) -> CatalogResult<T>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = CatalogResult<T>> + Send,
        T: Send,
    {
        let mut attempt: u32 = 1;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt > self.config.max_retries {
                        return Err(CatalogError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.delay_with_server_hint(attempt, e.retry_after());
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Use the server's Retry-After hint when it exceeds our own backoff.
    fn delay_with_server_hint(&self, attempt: u32, server_retry_after: Option<Duration>) -> Duration {
        let calculated = self.config.delay_for(attempt);
        match server_retry_after {
            Some(server_delay) if server_delay > calculated => server_delay,
            _ => calculated,
        }
    }
}
