//! Retry configuration for provider calls.

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for retry behavior.
///
/// `max_attempts` counts every call to the provider, the first one
/// included, so the default of 3 means at most two retries.
///
/// ```rust
/// use carrier_lookup::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_min_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(10))
///     .with_factor(1.5)
///     .with_max_attempts(5);
///
/// assert_eq!(config.delays().count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 1 second).
    #[serde(with = "duration_ms", rename = "min_delay_ms")]
    pub min_delay: Duration,
    /// Upper bound for any backoff delay (default: 30 seconds).
    #[serde(with = "duration_ms", rename = "max_delay_ms")]
    pub max_delay: Duration,
    /// Exponential backoff factor (default: 2.0).
    pub factor: f32,
    /// Total number of attempts, first call included (default: 3).
    pub max_attempts: usize,
    /// Ceiling for a provider supplied `Retry-After` hint (default: 5 minutes).
    #[serde(with = "duration_ms", rename = "max_retry_after_ms")]
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 3,
            max_retry_after: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries.
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Set the delay before the first retry.
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the exponential backoff factor.
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the ceiling for provider supplied retry delays.
    pub fn with_max_retry_after(mut self, limit: Duration) -> Self {
        self.max_retry_after = limit;
        self
    }

    /// Sleep before the next attempt: the backoff delay, raised to the
    /// provider's hint but never above `max_retry_after`.
    pub fn next_delay(&self, backoff: Duration, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => backoff.max(hint.min(self.max_retry_after)),
            None => backoff,
        }
    }

    /// Build a backoff strategy from this configuration.
    pub fn build_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Delays to sleep between consecutive attempts.
    pub fn delays(&self) -> ExponentialBackoff {
        self.build_strategy().build()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
