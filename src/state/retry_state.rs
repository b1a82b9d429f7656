use crate::protocol::{FetchError, RetryPolicy};
use std::time::{Duration, Instant};

/// Retry bookkeeping for one in-flight request
///
/// Created on the first retryable failure of a request and dropped when the
/// request succeeds or the budget runs out. Owned by the request that created
/// it and never shared.
#[derive(Debug)]
pub struct RetryState {
    /// The failure currently being retried
    pub error: FetchError,

    /// Retries still allowed
    pub retries_remaining: u32,

    /// Retries allowed in total
    pub total_retries: u32,

    /// Wait before each retry
    pub wait: Duration,

    /// When the next attempt may be sent
    pub next_attempt_at: Option<Instant>,
}

impl RetryState {
    /// Starts tracking retries for `error` under `policy`
    pub fn new(error: FetchError, policy: RetryPolicy) -> Self {
        Self {
            error,
            retries_remaining: policy.retries,
            total_retries: policy.retries,
            wait: policy.wait,
            next_attempt_at: None,
        }
    }

    /// Replaces the tracked failure with a newer one from the same request
    pub fn record_failure(&mut self, error: FetchError) {
        self.error = error;
    }

    /// Returns true once every allowed retry has been spent
    pub fn is_exhausted(&self) -> bool {
        self.retries_remaining == 0
    }

    /// Number of retries already spent
    pub fn retries_used(&self) -> u32 {
        self.total_retries - self.retries_remaining
    }

    /// Spends one retry and schedules it `wait` from `now`
    ///
    /// Returns the deadline, or `None` if the budget is already exhausted
    /// or the deadline lies beyond what the clock can represent.
    pub fn schedule_retry(&mut self, now: Instant) -> Option<Instant> {
        if self.is_exhausted() {
            return None;
        }
        let deadline = now.checked_add(self.wait)?;
        self.retries_remaining -= 1;
        self.next_attempt_at = Some(deadline);
        Some(deadline)
    }

    /// Gives back the last failure, consuming the state
    pub fn into_error(self) -> FetchError {
        self.error
    }
}
