//! Bounded retry for binary fetches
//!
//! A task gets at most [`RetryConfig::max_attempts`] attempts. Between two attempts the
//! worker sleeps; with the default configuration the delay is fixed, a multiplier above
//! 1.0 turns it into exponential backoff capped at `max_delay`.
//!
//! # Example
//!
//! ```no_run
//! use rank_dl::retry::{IsRetryable, fetch_with_retry};
//! use rank_dl::config::RetryConfig;
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
//! let value = fetch_with_retry(&config, || async {
//!     Ok::<_, MyError>(42)
//! })
//! .await
//! .map_err(|failure| failure.error)?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::Body(_) => true,
            // Too Many Requests and server-side errors may clear up
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            // Disk hiccups count as a failed attempt like any transport error
            FetchError::Write { .. } => true,
        }
    }
}

/// Last error of an operation that never succeeded, with the number of attempts made
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Error returned by the final attempt
    pub error: E,
    /// Attempts made, first one included
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or uses up `max_attempts`
///
/// Returns the value together with the number of attempts it took.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<(T, u32), RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Fetch succeeded after retry");
                }
                return Ok((value, attempt));
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Fetch failed, retrying"
                );

                let wait = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(wait).await;

                delay = capped_delay(
                    delay.as_secs_f64() * config.backoff_multiplier,
                    config.max_delay,
                );
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(error = %e, attempts = attempt, "Fetch attempts exhausted");
                } else {
                    tracing::debug!(error = %e, attempts = attempt, "Fetch failed permanently");
                }
                return Err(RetryFailure {
                    error: e,
                    attempts: attempt,
                });
            }
        }
    }
}

/// Convert `secs` to a delay no longer than `max`. Overflow and NaN land on `max`.
fn capped_delay(secs: f64, max: Duration) -> Duration {
    Duration::try_from_secs_f64(secs.min(max.as_secs_f64()))
        .unwrap_or(max)
        .min(max)
}

/// Add random jitter to a delay, somewhere between `delay` and `2 * delay`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
