//! Per-call options and batch outcomes.

use super::error::LookupServiceError;
use crate::types::LookupResult;
use tokio_util::sync::CancellationToken;

/// Options for a single lookup.
#[derive(Debug, Clone)]
pub struct LookupOptions {
    /// Read from and write to the result cache (default: true).
    pub use_cache: bool,
    /// Use this provider instead of automatic selection.
    pub provider: Option<String>,
    /// Aborts rate limiter waits, backoff sleeps and the provider call.
    pub cancel: Option<CancellationToken>,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            provider: None,
            cancel: None,
        }
    }
}

impl LookupOptions {
    /// Bypass the cache for this call.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider = Some(provider_id.into());
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Options for a batch lookup.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Read from and write to the result cache (default: true).
    pub use_cache: bool,
    pub provider: Option<String>,
    /// Extra pacing of provider calls in requests per second. Cache hits
    /// are not paced.
    pub rate_limit: Option<f64>,
    /// Overrides the configured batch concurrency.
    pub concurrency: Option<usize>,
    pub cancel: Option<CancellationToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            provider: None,
            rate_limit: None,
            concurrency: None,
            cancel: None,
        }
    }
}

impl BatchOptions {
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider = Some(provider_id.into());
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: f64) -> Self {
        self.rate_limit = Some(requests_per_second);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            use_cache: self.use_cache,
            provider: self.provider.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Outcome for one input of a batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<E = LookupServiceError> {
    /// The input exactly as given.
    pub input: String,
    pub outcome: Result<LookupResult, E>,
}

impl<E> BatchItem<E> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&LookupResult> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&E> {
        self.outcome.as_ref().err()
    }
}
