//! Service configuration types.

use super::error::ConfigError;
use crate::cache::DEFAULT_CACHE_TTL;
use crate::providers::DEFAULT_SNAPSHOT_TTL;
use crate::utils::{RateLimit, RetryConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default provider priority.
pub const DEFAULT_PRIORITY: [&str; 2] = ["telnyx", "twilio"];

/// Configuration for the [`LookupService`](super::LookupService).
#[derive(Debug, Clone, PartialEq)]
pub struct LookupServiceConfig {
    /// How long a cached result is served.
    pub cache_ttl: Duration,
    /// Rate limit for providers without an override.
    pub default_rate_limit: RateLimit,
    /// Per-provider rate limits, keyed by provider id.
    pub provider_rate_limits: HashMap<String, RateLimit>,
    /// Preferred provider order for automatic selection.
    pub provider_priority: Vec<String>,
    /// Backoff policy for retryable provider errors.
    pub retry: RetryConfig,
    /// Numbers of a batch resolved at the same time.
    pub batch_concurrency: usize,
    /// Lifetime of the registry's configured-provider snapshot.
    pub registry_snapshot_ttl: Duration,
}

impl Default for LookupServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            default_rate_limit: RateLimit::default(),
            provider_rate_limits: HashMap::new(),
            provider_priority: DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect(),
            retry: RetryConfig::default(),
            batch_concurrency: 1,
            registry_snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }
}

/// On-disk shape of the configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    cache_ttl_seconds: Option<u64>,
    rate_limit: Option<RateLimit>,
    rate_limits: HashMap<String, RateLimit>,
    priority: Option<Vec<String>>,
    retry: Option<RetryConfig>,
    batch_concurrency: Option<usize>,
    registry_snapshot_ttl_seconds: Option<u64>,
}

impl LookupServiceConfig {
    /// Create a new builder for LookupServiceConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use carrier_lookup::LookupServiceConfig;
    /// use std::time::Duration;
    ///
    /// let config = LookupServiceConfig::builder()
    ///     .cache_ttl(Duration::from_secs(3600))
    ///     .provider_priority(["twilio", "telnyx"])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    /// assert_eq!(config.provider_priority, vec!["twilio", "telnyx"]);
    /// ```
    pub fn builder() -> LookupServiceConfigBuilder {
        LookupServiceConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    ///
    /// Omitted keys keep their defaults.
    ///
    /// ```rust
    /// use carrier_lookup::LookupServiceConfig;
    ///
    /// let config = LookupServiceConfig::from_toml_str(r#"
    ///     cache_ttl_seconds = 600
    ///     priority = ["twilio"]
    ///
    ///     [rate_limits.twilio]
    ///     requests_per_second = 10.0
    ///     burst = 5
    /// "#).unwrap();
    ///
    /// assert_eq!(config.cache_ttl.as_secs(), 600);
    /// assert_eq!(config.rate_limit_for("twilio").burst, 5);
    /// assert_eq!(config.rate_limit_for("telnyx").requests_per_second, 2.0);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        let defaults = Self::default();

        let config = Self {
            cache_ttl: file
                .cache_ttl_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            default_rate_limit: file.rate_limit.unwrap_or(defaults.default_rate_limit),
            provider_rate_limits: file.rate_limits,
            provider_priority: file.priority.unwrap_or(defaults.provider_priority),
            retry: file.retry.unwrap_or(defaults.retry),
            batch_concurrency: file.batch_concurrency.unwrap_or(defaults.batch_concurrency),
            registry_snapshot_ttl: file
                .registry_snapshot_ttl_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.registry_snapshot_ttl),
        };

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Rate limit applied to `provider_id`.
    pub fn rate_limit_for(&self, provider_id: &str) -> RateLimit {
        self.provider_rate_limits
            .get(provider_id)
            .copied()
            .unwrap_or(self.default_rate_limit)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_rate_limit.is_valid() {
            return Err(ConfigError::invalid(
                "rate_limit",
                "requests_per_second must be positive and burst at least 1",
            ));
        }
        for (id, limit) in &self.provider_rate_limits {
            if !limit.is_valid() {
                return Err(ConfigError::invalid(
                    format!("rate_limits.{}", id),
                    "requests_per_second must be positive and burst at least 1",
                ));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.retry.factor.is_finite() && self.retry.factor >= 1.0) {
            return Err(ConfigError::invalid("retry.factor", "must be at least 1.0"));
        }
        if self.retry.min_delay > self.retry.max_delay {
            return Err(ConfigError::invalid(
                "retry.min_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(ConfigError::invalid("batch_concurrency", "must be at least 1"));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.provider_priority.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(ConfigError::invalid(
                "priority",
                format!("provider '{}' listed twice", dup),
            ));
        }
        Ok(())
    }
}

/// Builder for LookupServiceConfig.
#[derive(Debug, Clone, Default)]
pub struct LookupServiceConfigBuilder {
    pub(crate) config: LookupServiceConfig,
}

impl LookupServiceConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default: 86 400 seconds
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Default: 2 requests per second, burst of 2
    pub fn default_rate_limit(mut self, limit: RateLimit) -> Self {
        self.config.default_rate_limit = limit;
        self
    }

    /// Override the rate limit of one provider.
    pub fn provider_rate_limit(mut self, provider_id: impl Into<String>, limit: RateLimit) -> Self {
        self.config.provider_rate_limits.insert(provider_id.into(), limit);
        self
    }

    /// Default: `["telnyx", "twilio"]`
    pub fn provider_priority<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.provider_priority = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Default: 1 (sequential)
    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.config.batch_concurrency = concurrency;
        self
    }

    /// Default: 60 seconds
    pub fn registry_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.config.registry_snapshot_ttl = ttl;
        self
    }

    /// Validate and build the LookupServiceConfig.
    pub fn build(self) -> Result<LookupServiceConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
