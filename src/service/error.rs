//! Service-level error types.

use crate::errors::RetryableError;
use crate::providers::{ProviderError, ProviderErrorKind};
use crate::types::PhoneNumberError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`LookupService`](super::LookupService) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupServiceError {
    /// The input could not be normalized; no provider was contacted.
    #[error("invalid phone number: {0}")]
    Validation(#[from] PhoneNumberError),

    /// Classified failure from provider selection or a provider call.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The caller cancelled the lookup.
    #[error("lookup cancelled")]
    Cancelled,
}

/// Flat classification of a [`LookupServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupErrorKind {
    Validation,
    Configuration,
    Authentication,
    RateLimit,
    Network,
    Lookup,
    Cancelled,
}

impl fmt::Display for LookupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Lookup => "lookup",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl LookupServiceError {
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            Self::Validation(_) => LookupErrorKind::Validation,
            Self::Cancelled => LookupErrorKind::Cancelled,
            Self::Provider(e) => match e.kind() {
                ProviderErrorKind::Configuration => LookupErrorKind::Configuration,
                ProviderErrorKind::Authentication => LookupErrorKind::Authentication,
                ProviderErrorKind::RateLimit => LookupErrorKind::RateLimit,
                ProviderErrorKind::Network => LookupErrorKind::Network,
                ProviderErrorKind::Lookup => LookupErrorKind::Lookup,
            },
        }
    }

    /// The provider error, when this failure came from a provider.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl RetryableError for LookupServiceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Validation(_) | Self::Cancelled => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.provider_error().and_then(RetryableError::retry_after)
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
