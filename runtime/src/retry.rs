//! Retry logic with exponential backoff and per-attempt timeouts.
//!
//! Every call the engine makes to a collaborator (persistence, availability,
//! notification, review storage) goes through [`retry_with_backoff`] or
//! [`retry_with_predicate`], so no call blocks indefinitely and transient
//! failures are absorbed up to a fixed attempt ceiling.
//!
//! # Example
//!
//! ```rust
//! use booking_engine_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .attempt_timeout(Duration::from_secs(2))
//!     .build();
//!
//! let result = retry_with_backoff(&policy, "load_booking", || async {
//!     Ok::<_, String>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 4 (initial attempt + 3 retries)
/// - `initial_delay`: 100ms
/// - `max_delay`: 5 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
/// - `attempt_timeout`: 5 seconds
/// - `jitter`: enabled
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
    /// Scale each delay by a random factor in `[0.5, 1.0]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_attempts: None,
            initial_delay: None,
            max_delay: None,
            multiplier: None,
            attempt_timeout: None,
            jitter: None,
        }
    }

    /// Calculate delay after the given (0-indexed) failed attempt.
    ///
    /// Uses exponential backoff: `delay = initial_delay * multiplier^attempt`,
    /// capped at `max_delay`. With jitter enabled the result is scaled by a
    /// random factor between 0.5 and 1.0.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)] // attempt ceilings are tiny
        let base_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            use rand::Rng;
            capped_secs * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }

    /// Check whether another attempt is allowed after `attempts` tries.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    attempt_timeout: Option<Duration>,
    jitter: Option<bool>,
}

impl RetryPolicyBuilder {
    /// Set the attempt ceiling (values below 1 are treated as 1).
    #[must_use]
    pub const fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Bound every single attempt by `timeout`.
    #[must_use]
    pub const fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub const fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(4).max(1),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(5)),
            multiplier: self.multiplier.unwrap_or(2.0),
            attempt_timeout: self.attempt_timeout.unwrap_or(Duration::from_secs(5)),
            jitter: self.jitter.unwrap_or(true),
        }
    }
}

/// Why a retried operation finally gave up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The last attempt did not finish within the attempt timeout.
    #[error("timed out after {attempts} attempt(s)")]
    TimedOut {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The last attempt failed with `error`.
    #[error("failed after {attempts} attempt(s): {error}")]
    Exhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// Error returned by the last attempt
        error: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts that were made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::TimedOut { attempts } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Whether the final attempt timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Retry an async operation with exponential backoff.
///
/// Every attempt is bounded by `policy.attempt_timeout`. An attempt that
/// times out counts as a failure and is retried like any other.
///
/// # Errors
///
/// Returns [`RetryError::TimedOut`] or [`RetryError::Exhausted`] once
/// `policy.max_attempts` attempts have failed.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_predicate(policy, operation_name, operation, |_| true).await
}

/// Retry an async operation with custom retry logic.
///
/// Errors for which `is_retryable` returns `false` fail immediately.
/// Timeouts are always retryable.
///
/// # Errors
///
/// Returns [`RetryError::Exhausted`] with `attempts` equal to the attempts made
/// when a non-retryable error occurs or the attempt ceiling is reached, and
/// [`RetryError::TimedOut`] when the last attempt timed out.
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let outcome = tokio::time::timeout(policy.attempt_timeout, operation())
            .await
            .ok();

        let failure = match outcome {
            Some(Ok(result)) => {
                if attempts > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempts,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            },
            Some(Err(error)) => {
                if !is_retryable(&error) {
                    tracing::warn!(
                        operation = operation_name,
                        error = %error,
                        "Error is not retryable, failing immediately"
                    );
                    return Err(RetryError::Exhausted { attempts, error });
                }
                RetryError::Exhausted { attempts, error }
            },
            None => RetryError::TimedOut { attempts },
        };

        if !policy.should_retry(attempts) {
            tracing::error!(
                operation = operation_name,
                attempts,
                error = %failure,
                "Operation failed after max attempts"
            );
            return Err(failure);
        }

        let delay = policy.delay_for_attempt(attempts - 1);
        metrics::counter!(
            "booking_runtime_retries_total",
            "operation" => operation_name.to_string()
        )
        .increment(1);
        tracing::warn!(
            operation = operation_name,
            attempts,
            delay_ms = delay.as_millis(),
            error = %failure,
            "Operation failed, retrying..."
        );

        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_millis(5))
            .attempt_timeout(Duration::from_millis(50))
            .jitter(false)
            .build()
    }

    #[test]
    fn test_retry_policy_delay_calculation() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(10))
            .jitter(false)
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_policy_max_delay_cap() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(1000))
            .multiplier(10.0)
            .max_delay(Duration::from_secs(2))
            .jitter(false)
            .build();

        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_within_half_to_full_delay() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(400))
            .build();

        for _ in 0..20 {
            let delay = policy.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_attempt_timeout_defaults_to_five_seconds() {
        assert_eq!(RetryPolicy::default().attempt_timeout, Duration::from_secs(5));
        let policy = RetryPolicy::builder()
            .attempt_timeout(Duration::from_millis(250))
            .build();
        assert_eq!(policy.attempt_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::builder().max_attempts(0).build();
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_first_try() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_backoff(&fast_policy(3), "first_try", || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_backoff(&fast_policy(4), "flaky", || {
            let c = Arc::clone(&counter_clone);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(format!("Attempt {attempt} failed"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_backoff(&fast_policy(3), "broken", || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("Persistent failure")
            }
        })
        .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                error: "Persistent failure"
            })
        );
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let result = retry_with_backoff(&fast_policy(2), "slow", || async {
            sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(1)
        })
        .await;

        assert_eq!(result, Err(RetryError::TimedOut { attempts: 2 }));
        assert!(matches!(result, Err(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_retry_with_predicate_skips_non_retryable() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_predicate(
            &fast_policy(5),
            "permanent",
            || {
                let c = Arc::clone(&counter_clone);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("permanent error")
                }
            },
            |err: &&str| err.contains("transient"),
        )
        .await;

        assert_eq!(result.map_err(|e| e.attempts()), Err(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
