//! Retry logic with exponential backoff and a per-attempt timeout.
//!
//! Every network unit of work (one directory listing, one batch download)
//! runs through a [`RetryPolicy`]. Each attempt returns a
//! `Result<T, TransferError>`; the policy classifies failures into a
//! [`FailureType`] and decides via [`RetryPolicy::should_retry`] whether to
//! wait and try again.
//!
//! Three execution forms share the same decision and backoff code:
//!
//! - [`RetryPolicy::execute`] - suspending form for async attempts
//! - [`RetryPolicy::execute_spawned`] - suspending form for blocking
//!   attempts, each run on tokio's blocking pool
//! - [`RetryPolicy::execute_blocking`] - blocking form for the sequential
//!   mirror, which runs on a plain thread
//!
//! A blocking attempt cannot be cancelled. When one outlives the attempt
//! timeout, the policy waits for it to return (and release its session)
//! before reporting the timeout, so attempts of one operation never
//! overlap.
//!
//! # Delay Calculation
//!
//! ```text
//! delay(retry) = base_delay * 2^retry        (retry is 1-indexed)
//! ```
//!
//! With the default one second base the waits are 2s, 4s, 8s, 16s, 32s.
//!
//! # Example
//!
//! ```
//! use sitemirror_core::mirror::{RetryDecision, RetryPolicy, FailureType};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, retry } => {
//!         assert_eq!(delay, Duration::from_secs(2));
//!         assert_eq!(retry, 1);
//!     }
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::TransferError;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay; the first retry waits twice this long.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default ceiling for a single attempt (5 minutes).
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest exponent used for backoff; keeps the multiplication finite.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Network, protocol, timeout or local IO failure that may clear up.
    Transient,

    /// Failure that no amount of retrying will fix.
    ///
    /// Example: a listing returned a path outside the mirrored root.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run retry number `retry` (1-indexed).
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which retry this will be.
        retry: u32,
    },

    /// Give up and surface the last error.
    DoNotRetry {
        /// Human-readable reason why no retry is attempted.
        reason: String,
    },
}

/// Final result of a retried operation plus how many retries it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Value of the successful attempt, or the last error.
    pub result: Result<T, TransferError>,
    /// Number of retries performed (attempts minus one).
    pub retries: u32,
}

impl<T> RetryOutcome<T> {
    /// Discards the retry count.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's error when the operation never succeeded.
    pub fn into_result(self) -> Result<T, TransferError> {
        self.result
    }
}

/// Retry configuration shared by every network operation of a run.
///
/// # Default Values
///
/// - `max_retries`: 5
/// - `base_delay`: 1 second
/// - `attempt_timeout`: 300 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Base unit of the exponential backoff.
    base_delay: Duration,

    /// Ceiling for one attempt; exceeding it abandons the attempt.
    attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Retries after the initial attempt (0 disables retry)
    /// * `base_delay` - Backoff unit; retry `n` waits `base_delay * 2^n`
    /// * `attempt_timeout` - Ceiling for a single attempt
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempt_timeout,
        }
    }

    /// Creates a policy with a custom retry count, using defaults otherwise.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the configured retry count.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the backoff unit.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Decides whether to retry after `failed_attempts` attempts have failed.
    #[must_use]
    pub fn should_retry(&self, failure_type: FailureType, failed_attempts: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if failed_attempts > self.max_retries {
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        RetryDecision::Retry {
            delay: self.backoff_delay(failed_attempts),
            retry: failed_attempts,
        }
    }

    /// Returns the wait before retry number `retry` (1-indexed).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds or the policy gives up.
    ///
    /// Each attempt is bounded by the attempt timeout; a timed-out attempt
    /// future is dropped and counts as a transient failure.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let mut failed_attempts = 0u32;

        loop {
            debug!(operation, attempt = failed_attempts + 1, "starting attempt");

            let result = match tokio::time::timeout(self.attempt_timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(TransferError::timeout(operation, self.attempt_timeout)),
            };

            let error = match result {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries: failed_attempts,
                    };
                }
                Err(error) => error,
            };

            failed_attempts += 1;
            match self.next_step(operation, &error, failed_attempts) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    return RetryOutcome {
                        result: Err(error),
                        retries: failed_attempts - 1,
                    };
                }
            }
        }
    }

    /// Runs a blocking `operation` on tokio's blocking pool until it
    /// succeeds or the policy gives up.
    ///
    /// A timed-out attempt is awaited to completion before the timeout is
    /// reported, so its session is closed before the next attempt opens one.
    pub async fn execute_spawned<T, F>(&self, operation: &str, attempt_fn: F) -> RetryOutcome<T>
    where
        F: Fn() -> Result<T, TransferError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let attempt_fn = Arc::new(attempt_fn);
        let mut failed_attempts = 0u32;

        loop {
            debug!(operation, attempt = failed_attempts + 1, "starting attempt");

            let error = match self.run_spawned_attempt(operation, Arc::clone(&attempt_fn)).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries: failed_attempts,
                    };
                }
                Err(error) => error,
            };

            failed_attempts += 1;
            match self.next_step(operation, &error, failed_attempts) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    return RetryOutcome {
                        result: Err(error),
                        retries: failed_attempts - 1,
                    };
                }
            }
        }
    }

    /// Blocking counterpart of [`execute_spawned`](Self::execute_spawned).
    ///
    /// Each attempt runs on a helper thread so the timeout can fire while a
    /// protocol call is stuck. The helper is joined before the timeout is
    /// reported.
    pub fn execute_blocking<T, F>(&self, operation: &str, attempt_fn: F) -> RetryOutcome<T>
    where
        F: Fn() -> Result<T, TransferError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let attempt_fn = Arc::new(attempt_fn);
        let mut failed_attempts = 0u32;

        loop {
            debug!(operation, attempt = failed_attempts + 1, "starting attempt");

            let error = match self.run_blocking_attempt(operation, Arc::clone(&attempt_fn)) {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries: failed_attempts,
                    };
                }
                Err(error) => error,
            };

            failed_attempts += 1;
            match self.next_step(operation, &error, failed_attempts) {
                Some(delay) => thread::sleep(delay),
                None => {
                    return RetryOutcome {
                        result: Err(error),
                        retries: failed_attempts - 1,
                    };
                }
            }
        }
    }

    fn run_blocking_attempt<T, F>(&self, operation: &str, attempt_fn: Arc<F>) -> Result<T, TransferError>
    where
        F: Fn() -> Result<T, TransferError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let spawned = thread::Builder::new()
            .name("mirror-attempt".to_string())
            .spawn(move || {
                // Receiver is gone when the attempt already timed out.
                let _ = tx.send((*attempt_fn)());
            });

        let helper = match spawned {
            Ok(helper) => helper,
            Err(spawn_error) => {
                warn!(operation, error = %spawn_error, "could not spawn attempt thread");
                return Err(TransferError::aborted(operation));
            }
        };

        match rx.recv_timeout(self.attempt_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.log_timeout(operation);
                if helper.join().is_err() {
                    debug!(operation, "timed-out attempt panicked");
                }
                Err(TransferError::timeout(operation, self.attempt_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TransferError::aborted(operation)),
        }
    }

    async fn run_spawned_attempt<T, F>(&self, operation: &str, attempt_fn: Arc<F>) -> Result<T, TransferError>
    where
        F: Fn() -> Result<T, TransferError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let mut task = tokio::task::spawn_blocking(move || (*attempt_fn)());

        match tokio::time::timeout(self.attempt_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                debug!(operation, error = %join_error, "attempt task failed");
                Err(TransferError::aborted(operation))
            }
            Err(_) => {
                self.log_timeout(operation);
                match task.await {
                    Ok(late) => debug!(operation, succeeded = late.is_ok(), "timed-out attempt returned"),
                    Err(join_error) => debug!(operation, error = %join_error, "timed-out attempt failed"),
                }
                Err(TransferError::timeout(operation, self.attempt_timeout))
            }
        }
    }

    fn log_timeout(&self, operation: &str) {
        warn!(
            operation,
            timeout_ms = u64::try_from(self.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
            "attempt timed out, waiting for it to release its session"
        );
    }

    /// Logs the failure and returns the delay before the next attempt, or
    /// `None` when the policy gives up.
    fn next_step(&self, operation: &str, error: &TransferError, failed_attempts: u32) -> Option<Duration> {
        match self.should_retry(classify_error(error), failed_attempts) {
            RetryDecision::Retry { delay, retry } => {
                warn!(
                    operation,
                    attempt = retry,
                    max_retries = self.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "retrying after failure"
                );
                Some(delay)
            }
            RetryDecision::DoNotRetry { reason } => {
                error!(
                    operation,
                    attempts = failed_attempts,
                    %reason,
                    error = %error,
                    "giving up"
                );
                None
            }
        }
    }
}

/// Classifies a transfer error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Connect, Protocol, Verification | Transient |
/// | LocalIo, Timeout, Aborted | Transient |
/// | OutsideRoot | Permanent |
#[must_use]
pub fn classify_error(error: &TransferError) -> FailureType {
    match error {
        TransferError::OutsideRoot { .. } => FailureType::Permanent,
        TransferError::Connect { .. }
        | TransferError::Protocol { .. }
        | TransferError::Verification { .. }
        | TransferError::LocalIo { .. }
        | TransferError::Timeout { .. }
        | TransferError::Aborted { .. } => FailureType::Transient,
    }
}
