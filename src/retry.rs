//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient failures.
//! It implements exponential backoff with an upper ceiling per attempt and
//! optional jitter. A server-provided `Retry-After` delay replaces the computed
//! backoff for that attempt.
//!
//! # Example
//!
//! ```no_run
//! use ridb_dl::retry::{IsRetryable, with_retry};
//! use ridb_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::TransportError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (rate limiting, gateway errors, timeouts) should return `true`.
/// Permanent failures (not found, unauthorized, bad JSON) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Delay the remote side asked for before the next attempt
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            // The transport already classified the status against the configured set
            TransportError::Status { transient, .. } => *transient,
            TransportError::Network(e) => e.is_timeout() || e.is_connect(),
            TransportError::Decode { .. } => false,
            TransportError::InvalidUrl(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay.min(config.max_delay);

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                let wait = match e.retry_after() {
                    Some(requested) => requested.min(config.max_delay),
                    None if config.jitter => add_jitter(delay).min(config.max_delay),
                    None => delay,
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "Request failed, retrying"
                );

                tokio::time::sleep(wait).await;

                // Non-finite or overflowing products saturate at the ceiling
                let next_delay =
                    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                        .unwrap_or(config.max_delay);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay,
/// so the result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
