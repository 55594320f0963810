//! Retry policy for transient database failures.

use std::time::Duration;

use sproc_core::config::database_config::DEFAULT_TRANSIENT_ERROR_CODES;
use sproc_core::config::DatabaseConfig;
use sproc_core::errors::GatewayError;

/// Which failures are retried, how often, and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay unit: attempt `n` waits `backoff_base * 2^n` before retrying.
    pub backoff_base: Duration,
    /// Server error numbers that are worth retrying.
    pub transient_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            transient_codes: DEFAULT_TRANSIENT_ERROR_CODES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_attempts: config.effective_max_retry_attempts().max(1),
            backoff_base: config.effective_retry_backoff_base(),
            transient_codes: config.effective_transient_error_codes(),
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.backoff_base.saturating_mul(factor)
    }

    /// Whether a failure on `attempt` should be followed by another attempt.
    pub fn should_retry(&self, error: &GatewayError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_transient(&self.transient_codes)
    }
}
