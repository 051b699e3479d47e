use std::time::Duration;

use crate::{ClientOptions, Outcome};

/// Whether to try again, and how long to wait first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    fn stop() -> Self {
        Self {
            should_retry: false,
            delay: Duration::ZERO,
        }
    }

    fn after(delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay,
        }
    }
}

/// Bounded linear backoff.
///
/// Attempt `n` (0-based) that fails with a retryable outcome is followed by
/// a pause of `base_delay * (n + 1)`, unless the server supplied a
/// `Retry-After` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    pub fn decide(&self, attempt: usize, outcome: &Outcome) -> RetryDecision {
        if attempt >= self.max_retries || !outcome.is_retryable() {
            return RetryDecision::stop();
        }

        if let Outcome::RateLimited {
            retry_after_seconds,
        } = outcome
        {
            return RetryDecision::after(Duration::from_secs(*retry_after_seconds));
        }

        RetryDecision::after(self.backoff(attempt))
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let multiplier = u32::try_from(attempt.saturating_add(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ClientOptions::default())
    }
}

impl From<&ClientOptions> for RetryPolicy {
    fn from(options: &ClientOptions) -> Self {
        Self::new(
            options.max_retries,
            Duration::from_millis(options.retry_backoff_ms),
        )
    }
}
