use crate::error::GradingError;
use std::time::Duration;
use util::config;

/// How often, and how patiently, a failed job is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubled for each attempt after that.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_config() -> Self {
        Self {
            max_attempts: config::task_max_attempts(),
            base_backoff: Duration::from_secs(config::task_retry_backoff_secs()),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1u32 << exponent)
    }

    pub fn should_retry(&self, attempt: u32, error: &GradingError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }
}
