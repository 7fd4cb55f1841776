use std::fmt;
use std::time::Duration;

use rand::Rng;

use crate::{ConnectorError, ErrorKind};

/// Result of the most recent attempt, as seen by a [`RetryPolicy`].
#[derive(Clone, Copy, Debug)]
pub enum AttemptOutcome<'a> {
    Success,
    Failure(&'a ConnectorError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay_before_next_attempt: Duration,
    pub attempts_so_far: u32,
}

impl RetryDecision {
    pub fn stop(attempts_so_far: u32) -> Self {
        Self {
            should_retry: false,
            delay_before_next_attempt: Duration::ZERO,
            attempts_so_far,
        }
    }

    pub fn retry_after(attempts_so_far: u32, delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay_before_next_attempt: delay,
            attempts_so_far,
        }
    }
}

/// Decides whether a failed call is attempted again.
///
/// One policy instance is shared by every call on a client, so
/// implementations must not keep per-call state: everything they need is
/// in the arguments.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    fn decide(&self, attempts_so_far: u32, outcome: AttemptOutcome<'_>) -> RetryDecision;
}

/// Default classification: only [`ErrorKind::Transient`] failures are retried.
pub fn is_retryable(outcome: AttemptOutcome<'_>) -> bool {
    match outcome {
        AttemptOutcome::Success => false,
        AttemptOutcome::Failure(err) => err.kind() == ErrorKind::Transient,
    }
}

/// Exponential backoff with jitter for transient failures.
///
/// Delay for retry `n` (1-based) is `min(base * 2^(n-1), max)`, widened by
/// `±jitter_ratio` and capped again at `max`. A server `Retry-After` takes
/// precedence when `respect_retry_after` is set.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_ratio: f64,
    respect_retry_after: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter_ratio: 0.2,
            respect_retry_after: true,
        }
    }
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total attempts including the first one; at least 1.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        if self.max_delay < self.base_delay {
            self.max_delay = self.base_delay;
        }
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay.max(self.base_delay);
        self
    }

    pub fn jitter_ratio(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = jitter_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    pub(crate) fn backoff_for_retry(&self, retry_index: u32) -> Duration {
        let exp = retry_index.saturating_sub(1).min(31);
        let multiplier = 1u128 << exp;
        let base_ms = self.base_delay.as_millis();
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);
        let delay = Duration::from_millis(delay_ms.min(u64::MAX as u128) as u64);
        self.apply_jitter(delay)
    }

    fn apply_jitter(&self, backoff: Duration) -> Duration {
        let backoff_ms = backoff.as_millis().min(u64::MAX as u128) as u64;
        if self.jitter_ratio <= f64::EPSILON || backoff_ms <= 1 {
            return backoff;
        }
        let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
        let span = ((backoff_ms as f64) * self.jitter_ratio).round().max(1.0) as u64;
        let low = backoff_ms.saturating_sub(span);
        let high = backoff_ms.saturating_add(span);
        let sampled = rand::thread_rng().gen_range(low..=high).min(max_ms.max(1));
        Duration::from_millis(sampled)
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn decide(&self, attempts_so_far: u32, outcome: AttemptOutcome<'_>) -> RetryDecision {
        if attempts_so_far >= self.max_attempts || !is_retryable(outcome) {
            return RetryDecision::stop(attempts_so_far);
        }
        let server_hint = match outcome {
            AttemptOutcome::Failure(err) if self.respect_retry_after => err.retry_after(),
            _ => None,
        };
        let delay = server_hint.unwrap_or_else(|| self.backoff_for_retry(attempts_so_far));
        RetryDecision::retry_after(attempts_so_far, delay)
    }
}

/// Retries transient failures at a constant interval.
#[derive(Clone, Debug)]
pub struct FixedInterval {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl FixedInterval {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

impl RetryPolicy for FixedInterval {
    fn decide(&self, attempts_so_far: u32, outcome: AttemptOutcome<'_>) -> RetryDecision {
        if attempts_so_far >= self.max_attempts || !is_retryable(outcome) {
            return RetryDecision::stop(attempts_so_far);
        }
        RetryDecision::retry_after(attempts_so_far, self.interval)
    }
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide(&self, attempts_so_far: u32, _outcome: AttemptOutcome<'_>) -> RetryDecision {
        RetryDecision::stop(attempts_so_far)
    }
}
