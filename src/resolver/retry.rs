//! Retry and back-off policy.

use std::time::Duration;

use crate::config::RetryConfig;

/// How often and how patiently each endpoint is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, per endpoint.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Retries granted when the info endpoint asks for a reload.
    pub reload_retries: u32,
}

impl RetryPolicy {
    /// A policy that never retries. Useful for tests and one-shot probes.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            reload_retries: 0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    pub fn with_reload_retries(mut self, reload_retries: u32) -> Self {
        self.reload_retries = reload_retries;
        self
    }

    /// Delay before retry number `attempt` (zero-based): `initial * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether an HTTP status is worth retrying on the same endpoint.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        status >= 500
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            reload_retries: config.reload_retries,
        }
    }
}
