//! Classified provider errors.

use crate::errors::RetryableError;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Configuration,
    Authentication,
    RateLimit,
    Network,
    Lookup,
}

impl Display for ProviderErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Lookup => "lookup",
        };
        f.write_str(name)
    }
}

/// Error raised by a provider adapter or by provider selection.
///
/// Every variant names the provider it came from and keeps the provider's
/// own message so callers can present actionable guidance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Missing or invalid local configuration (credentials, provider id, priority list).
    #[error("{provider}: configuration error: {message}")]
    Configuration { provider: String, message: String },

    /// The remote service rejected the credentials.
    #[error("{provider}: authentication failed: {message}")]
    Authentication { provider: String, message: String },

    /// The remote service asked us to slow down.
    #[error("{provider}: rate limited: {message}")]
    RateLimited {
        provider: String,
        message: String,
        /// Delay requested by the remote side, if any.
        retry_after: Option<Duration>,
    },

    /// Transport failure, timeout or transient server-side error.
    #[error("{provider}: network error: {message}")]
    Network { provider: String, message: String },

    /// Remote business error such as an unknown or malformed number.
    #[error("{provider}: lookup failed{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Lookup {
        provider: String,
        message: String,
        /// Raw HTTP status, when the error came from a response.
        status: Option<u16>,
    },
}

impl ProviderError {
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
            retry_after,
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn lookup(
        provider: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self::Lookup {
            provider: provider.into(),
            message: message.into(),
            status,
        }
    }

    /// Map a non-success HTTP status to an error kind.
    ///
    /// | Status | Kind |
    /// |--------|------|
    /// | 401, 403 | authentication |
    /// | 429 | rate limit |
    /// | 400, 404, 422 | lookup |
    /// | 5xx | network |
    /// | anything else | lookup, status preserved |
    pub fn from_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let provider = provider.into();
        let message = message.into();
        match status {
            401 | 403 => Self::authentication(provider, message),
            429 => Self::rate_limited(provider, message, retry_after),
            400 | 404 | 422 => Self::lookup(provider, message, Some(status)),
            500..=599 => Self::network(provider, format!("HTTP {}: {}", status, message)),
            _ => Self::lookup(provider, message, Some(status)),
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Configuration { .. } => ProviderErrorKind::Configuration,
            Self::Authentication { .. } => ProviderErrorKind::Authentication,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimit,
            Self::Network { .. } => ProviderErrorKind::Network,
            Self::Lookup { .. } => ProviderErrorKind::Lookup,
        }
    }

    /// Provider that produced the error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Configuration { provider, .. }
            | Self::Authentication { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Network { provider, .. }
            | Self::Lookup { provider, .. } => provider,
        }
    }

    /// Original message from the provider.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. }
            | Self::Authentication { message, .. }
            | Self::RateLimited { message, .. }
            | Self::Network { message, .. }
            | Self::Lookup { message, .. } => message,
        }
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Network { .. } => true,
            ProviderError::Configuration { .. }
            | ProviderError::Authentication { .. }
            | ProviderError::Lookup { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
