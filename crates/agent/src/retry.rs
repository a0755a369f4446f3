//! Retry with exponential backoff bounded by cumulative wait.
//!
//! Used by the `service-with-backoff` mode to ride out flaky Marathon or
//! ACME endpoints instead of failing the task and getting rescheduled.
//!
//! Individual sleeps are not capped; the ceiling is checked before each
//! sleep, so the total wait is bounded by the ceiling plus one interval.
//!
//! # Example
//!
//! ```ignore
//! use certsync_agent::retry::{retry_with_backoff, BackoffPolicy};
//!
//! let outcome = retry_with_backoff(&BackoffPolicy::default(), "certificate run", || {
//!     workflow.run_once()
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use certsync_config::Timings;

use crate::error::CertResult;

/// Backoff schedule for a failing operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Sleep after the first failure
    pub initial_delay: Duration,
    /// Cumulative sleep after which the last error is returned
    pub ceiling: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            ceiling: Duration::from_secs(60 * 60),
            multiplier: 2,
        }
    }
}

impl From<&Timings> for BackoffPolicy {
    fn from(timings: &Timings) -> Self {
        Self {
            initial_delay: timings.backoff_initial,
            ceiling: timings.backoff_ceiling,
            ..Default::default()
        }
    }
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// cumulative backoff reaches the ceiling
///
/// The error returned is always the one from the final attempt.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &BackoffPolicy,
    operation_name: &str,
    mut operation: F,
) -> CertResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CertResult<T>>,
{
    let mut attempt = 0u32;
    let mut delay = policy.initial_delay;
    let mut waited = Duration::ZERO;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        operation = %operation_name,
                        attempt = attempt,
                        waited_secs = waited.as_secs(),
                        "Operation succeeded after retries"
                    );
                }
                return Ok(result);
            }
            Err(e) if !e.is_retryable() => {
                error!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    "Operation failed with non-retryable error"
                );
                return Err(e);
            }
            Err(e) => {
                if waited >= policy.ceiling {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        waited_secs = waited.as_secs(),
                        error = %e,
                        "Operation still failing after backoff ceiling"
                    );
                    return Err(e);
                }

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
                waited += delay;
                delay = delay.saturating_mul(policy.multiplier);
            }
        }
    }
}
