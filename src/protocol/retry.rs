//! Retry budgets for protocol requests
//!
//! The crawl engine decides how hard a harvest may push a struggling
//! repository. The query client only asks, per failure kind, how many
//! retries it gets and how long to wait before each.

use crate::config::RetryConfig;
use crate::protocol::FailureKind;
use std::time::Duration;

/// Retries allowed for one failure kind, and the wait before each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub wait: Duration,
}

impl RetryPolicy {
    /// A policy that never retries
    pub const NONE: RetryPolicy = RetryPolicy {
        retries: 0,
        wait: Duration::ZERO,
    };
}

/// Retry-budget accessor provided by the crawl engine
pub trait RetryBudget: Send + Sync {
    /// Budget for a failure of the given kind
    fn budget(&self, kind: FailureKind) -> RetryPolicy;
}

/// Retry budget read from the `[retry]` configuration section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredRetryBudget {
    network: RetryPolicy,
    same_url: RetryPolicy,
}

impl ConfiguredRetryBudget {
    pub fn new(network_retries: u32, same_url_retries: u32, wait: Duration) -> Self {
        Self {
            network: RetryPolicy {
                retries: network_retries,
                wait,
            },
            same_url: RetryPolicy {
                retries: same_url_retries,
                wait,
            },
        }
    }
}

impl From<&RetryConfig> for ConfiguredRetryBudget {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.network_retries,
            config.same_url_retries,
            Duration::from_millis(config.wait_ms),
        )
    }
}

impl RetryBudget for ConfiguredRetryBudget {
    fn budget(&self, kind: FailureKind) -> RetryPolicy {
        match kind {
            FailureKind::RetryableNetwork => self.network,
            FailureKind::RetryableSameUrl => self.same_url,
            FailureKind::DeadLink | FailureKind::Fatal => RetryPolicy::NONE,
        }
    }
}
