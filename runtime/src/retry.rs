//! Retry with exponential backoff for contended per-ticket tokens.
//!
//! A redemption that finds its ticket's token taken can either give up at
//! once (`busy`) or wait a little and try again. [`RetryPolicy`] describes
//! the waiting; [`retry_with_backoff`] runs a non-blocking attempt under it.
//!
//! # Example
//!
//! ```rust
//! use turnstile_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(5))
//!     .build();
//!
//! let mut calls = 0;
//! let value = retry_with_backoff(&policy, || {
//!     calls += 1;
//!     (calls == 3).then_some(42)
//! })
//! .await;
//!
//! assert_eq!(value, Some(42));
//! # }
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 0 (fail fast)
/// - `initial_delay`: 10ms
/// - `max_delay`: 200ms
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub const fn fail_fast() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }

    /// Create a new policy builder, starting from [`RetryPolicy::fail_fast`].
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self::fail_fast(),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let nanos = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent) * 1e9).round();
        let max_nanos = self.max_delay.as_secs_f64() * 1e9;

        if nanos.is_nan() || nanos >= max_nanos {
            return self.max_delay;
        }
        if nanos <= 0.0 {
            return Duration::ZERO;
        }

        // 0 < nanos < max_delay in nanoseconds, so the value fits in a u64
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_nanos(nanos as u64)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `attempt` until it yields a value or the policy is exhausted.
///
/// `attempt` must not block; between failed attempts this sleeps on the
/// tokio timer, so other tasks keep running.
pub async fn retry_with_backoff<F, T>(policy: &RetryPolicy, mut attempt: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let mut retry = 0;

    loop {
        if let Some(value) = attempt() {
            if retry > 0 {
                tracing::debug!(retry, "Attempt succeeded after retry");
            }
            return Some(value);
        }

        if retry >= policy.max_retries {
            return None;
        }

        let delay = policy.delay_for_attempt(retry);
        tracing::debug!(retry, delay_ms = delay.as_millis(), "Attempt failed, backing off");
        sleep(delay).await;
        retry += 1;
    }
}
