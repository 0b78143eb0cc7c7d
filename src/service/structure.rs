//! Main service implementation.

use super::config::{LookupServiceConfig, LookupServiceConfigBuilder};
use super::error::{ConfigError, LookupServiceError};
use super::options::{BatchItem, BatchOptions, LookupOptions};
use super::traits::PhoneLookup;
use crate::cache::{
    CacheError, CacheStats, CacheStore, Clock, MemoryCacheStore, RecentEntry, ResultCache,
};
use crate::credentials::CredentialSource;
use crate::errors::RetryableError;
use crate::providers::{
    ProviderDescriptor, ProviderError, ProviderRegistry, ResolvedProvider, SharedProvider,
};
use crate::types::{LookupResult, PhoneNumber};
use crate::utils::rate_limiter::cancelled;
use crate::utils::{RateLimit, RateLimiter, RetryConfig, TokenBucket};
use backon::Retryable;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Lookup orchestrator.
///
/// This service handles the full path of a lookup:
/// - Normalizing the raw input
/// - Serving fresh results from the cache
/// - Resolving a provider through the [`ProviderRegistry`]
/// - Waiting for a rate limiter token
/// - Calling the provider, retrying rate limit and network errors
/// - Writing successful results back to the cache
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::{
///     EnvCredentials, LookupOptions, LookupService, PhoneLookup, SqliteCacheStore,
/// };
/// use std::sync::Arc;
///
/// let store = SqliteCacheStore::open("lookup_cache.db").await?;
/// let service = LookupService::builder()
///     .cache_store(Arc::new(store))
///     .default_providers(Arc::new(EnvCredentials))
///     .build()?;
///
/// let result = service.lookup("(617) 555-0100", &LookupOptions::default()).await?;
/// println!("{:?} via {}", result.carrier_name(), result.provider_id());
/// ```
pub struct LookupService {
    registry: Arc<ProviderRegistry>,
    cache: ResultCache,
    limiter: RateLimiter,
    config: LookupServiceConfig,
    /// Requested priority, applied to whichever providers are registered.
    priority: RwLock<Vec<String>>,
    in_flight: StdMutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl fmt::Debug for LookupService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupService")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LookupService {
    /// Create a service from its parts.
    ///
    /// The cache TTL and the provider priority are taken from `config`.
    /// Priority entries that are not registered yet are applied once they
    /// are registered through [`register_provider`](Self::register_provider).
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: ResultCache,
        config: LookupServiceConfig,
    ) -> Self {
        cache.set_ttl(config.cache_ttl);
        let limiter = RateLimiter::new(
            config.default_rate_limit,
            config.provider_rate_limits.clone(),
        );

        let service = Self {
            registry,
            cache,
            limiter,
            priority: RwLock::new(config.provider_priority.clone()),
            config,
            in_flight: StdMutex::new(HashMap::new()),
        };
        service.apply_priority();
        service
    }

    /// Create a new builder for LookupService.
    pub fn builder() -> LookupServiceBuilder {
        LookupServiceBuilder::new()
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn config(&self) -> &LookupServiceConfig {
        &self.config
    }

    // =========================================================================
    // Provider management
    // =========================================================================

    /// Register a provider adapter under `id`.
    pub fn register_provider(&self, id: impl Into<String>, provider: SharedProvider) {
        self.registry.register(id, provider);
        self.apply_priority();
    }

    /// Remove a provider adapter. Returns true when one was removed.
    pub fn deregister_provider(&self, id: &str) -> bool {
        self.registry.deregister(id)
    }

    /// Replace the provider priority. Every id must be registered.
    pub fn set_provider_priority<I, S>(&self, ids: I) -> Result<(), LookupServiceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.registry.set_priority(ids.clone())?;
        *self.priority.write().unwrap_or_else(PoisonError::into_inner) = ids;
        Ok(())
    }

    /// Status of every registered provider.
    pub fn provider_status(&self) -> Vec<ProviderDescriptor> {
        self.registry.status()
    }

    fn apply_priority(&self) {
        let registered = self.registry.provider_ids();
        let effective: Vec<String> = self
            .priority
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|id| registered.contains(id))
            .cloned()
            .collect();

        if let Err(_e) = self.registry.set_priority(effective) {
            #[cfg(feature = "tracing")]
            warn!(error = %_e, "Failed to apply provider priority");
        }
    }

    // =========================================================================
    // Cache management
    // =========================================================================

    pub async fn cache_stats(&self) -> Result<CacheStats, CacheError> {
        self.cache.stats().await
    }

    /// Remove every cached result. Returns the number removed.
    pub async fn clear_cache(&self) -> Result<u64, CacheError> {
        self.cache.clear().await
    }

    /// Remove expired cached results. Returns the number removed.
    pub async fn clear_expired_cache(&self) -> Result<u64, CacheError> {
        self.cache.clear_expired().await
    }

    pub async fn recent_lookups(&self, limit: usize) -> Result<Vec<RecentEntry>, CacheError> {
        self.cache.recent(limit).await
    }

    /// Change the cache TTL. Applies to entries already stored.
    pub fn set_cache_ttl(&self, ttl: Duration) {
        self.cache.set_ttl(ttl);
    }

    // =========================================================================
    // Lookup path
    // =========================================================================

    /// Lock serializing lookups of one key.
    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = in_flight.get(key).and_then(Weak::upgrade) {
            return lock;
        }
        in_flight.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        in_flight.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    async fn lookup_number(
        &self,
        number: &PhoneNumber,
        options: &LookupOptions,
        pacer: Option<&TokenBucket>,
    ) -> Result<LookupResult, LookupServiceError> {
        let cancel = options.cancel.as_ref();
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(LookupServiceError::Cancelled);
        }

        if options.use_cache
            && let Some(hit) = self.cache.get(number).await
        {
            #[cfg(feature = "tracing")]
            debug!(number = %number, provider = hit.provider_id(), "Cache hit");
            return Ok(hit);
        }

        // A concurrent lookup of the same key may be about to fill the cache.
        let _in_flight = if options.use_cache {
            let lock = self.key_lock(number.as_str());
            let guard = tokio::select! {
                biased;
                _ = cancelled(cancel) => return Err(LookupServiceError::Cancelled),
                guard = lock.lock_owned() => guard,
            };
            if let Some(hit) = self.cache.get(number).await {
                #[cfg(feature = "tracing")]
                debug!(number = %number, "Cache filled by concurrent lookup");
                return Ok(hit);
            }
            Some(guard)
        } else {
            None
        };

        let resolved = self
            .registry
            .provider_for_call(options.provider.as_deref())?;

        if let Some(pacer) = pacer {
            pacer
                .acquire(cancel)
                .await
                .map_err(|_| LookupServiceError::Cancelled)?;
        }

        let result = self.call_provider(&resolved, number, cancel).await?;

        // Finished after the caller gave up: do not publish.
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(LookupServiceError::Cancelled);
        }

        if options.use_cache
            && let Err(_e) = self.cache.put(&result).await
        {
            #[cfg(feature = "tracing")]
            warn!(number = %number, error = %_e, "Failed to store lookup result in cache");
        }

        #[cfg(feature = "tracing")]
        info!(
            number = %number,
            provider = %resolved.id,
            carrier = result.carrier_name().unwrap_or("unknown"),
            line_type = %result.carrier_type(),
            "Lookup succeeded"
        );

        Ok(result)
    }

    /// Call the provider, retrying retryable errors with backoff.
    ///
    /// Every attempt takes a token from the provider's bucket first.
    async fn call_provider(
        &self,
        resolved: &ResolvedProvider,
        number: &PhoneNumber,
        cancel: Option<&CancellationToken>,
    ) -> Result<LookupResult, LookupServiceError> {
        let id = resolved.id.as_str();
        let provider = &resolved.provider;
        let limiter = &self.limiter;

        let attempt = || async move {
            limiter.wait(id).await;
            provider.lookup(number).await
        };

        let retrying = attempt
            .retry(self.config.retry.build_strategy())
            .when(|err: &ProviderError| err.is_retryable())
            .adjust(|err: &ProviderError, backoff: Option<Duration>| {
                backoff.map(|delay| self.config.retry.next_delay(delay, err.retry_after()))
            })
            .notify(|_err: &ProviderError, _delay: Duration| {
                #[cfg(feature = "tracing")]
                warn!(
                    provider = %id,
                    error = %_err,
                    retry_in_secs = %_delay.as_secs_f64(),
                    "Retrying lookup"
                );
            });

        tokio::select! {
            biased;
            _ = cancelled(cancel) => Err(LookupServiceError::Cancelled),
            outcome = retrying => outcome.map_err(|err| {
                #[cfg(feature = "tracing")]
                warn!(provider = %id, kind = %err.kind(), error = %err, "Lookup failed");
                LookupServiceError::from(err)
            }),
        }
    }
}

impl PhoneLookup for LookupService {
    type Error = LookupServiceError;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "lookup_service.lookup",
            skip_all,
            fields(input = %number)
        )
    )]
    async fn lookup(
        &self,
        number: &str,
        options: &LookupOptions,
    ) -> Result<LookupResult, Self::Error> {
        let number = PhoneNumber::parse(number)?;
        self.lookup_number(&number, options, None).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "lookup_service.batch_lookup",
            skip_all,
            fields(count = numbers.len())
        )
    )]
    async fn batch_lookup<S>(&self, numbers: &[S], options: &BatchOptions) -> Vec<BatchItem>
    where
        S: AsRef<str> + Sync,
    {
        let lookup_options = options.lookup_options();
        let concurrency = options
            .concurrency
            .unwrap_or(self.config.batch_concurrency)
            .max(1);

        let pacer = options.rate_limit.and_then(|rps| {
            let limit = RateLimit::new(rps, 1);
            if limit.is_valid() {
                Some(TokenBucket::new(limit))
            } else {
                #[cfg(feature = "tracing")]
                warn!(rate_limit = rps, "Ignoring invalid batch rate limit");
                None
            }
        });

        let parsed: Vec<_> = numbers
            .iter()
            .map(|n| PhoneNumber::parse(n.as_ref()))
            .collect();

        let mut seen = HashSet::new();
        let unique: Vec<PhoneNumber> = parsed
            .iter()
            .flatten()
            .filter(|n| seen.insert(n.as_str()))
            .cloned()
            .collect();

        #[cfg(feature = "tracing")]
        debug!(
            inputs = numbers.len(),
            unique = unique.len(),
            concurrency,
            "Starting batch lookup"
        );

        let outcomes: HashMap<String, Result<LookupResult, LookupServiceError>> =
            stream::iter(unique)
                .map(|number| {
                    let lookup_options = &lookup_options;
                    let pacer = pacer.as_ref();
                    async move {
                        let outcome = self.lookup_number(&number, lookup_options, pacer).await;
                        (number.as_str().to_string(), outcome)
                    }
                })
                .buffered(concurrency)
                .collect()
                .await;

        let items: Vec<BatchItem> = numbers
            .iter()
            .zip(parsed)
            .map(|(input, parsed)| {
                let outcome = match parsed {
                    Err(e) => Err(LookupServiceError::Validation(e)),
                    Ok(number) => outcomes
                        .get(number.as_str())
                        .cloned()
                        .unwrap_or(Err(LookupServiceError::Cancelled)),
                };
                BatchItem {
                    input: input.as_ref().to_string(),
                    outcome,
                }
            })
            .collect();

        #[cfg(feature = "tracing")]
        info!(
            total = items.len(),
            succeeded = items.iter().filter(|i| i.is_ok()).count(),
            "Batch lookup finished"
        );

        items
    }
}

/// Builder for LookupService.
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::{LookupService, StaticCredentials};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let service = LookupService::builder()
///     .cache_ttl(Duration::from_secs(3600))
///     .provider_priority(["twilio", "telnyx"])
///     .default_providers(Arc::new(StaticCredentials::new()))
///     .build()?;
/// ```
pub struct LookupServiceBuilder {
    registry: Option<Arc<ProviderRegistry>>,
    store: Option<Arc<dyn CacheStore>>,
    clock: Option<Arc<dyn Clock>>,
    config_builder: LookupServiceConfigBuilder,
    providers: Vec<(String, SharedProvider)>,
    credentials: Option<Arc<dyn CredentialSource>>,
}

impl Default for LookupServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupServiceBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            store: None,
            clock: None,
            config_builder: LookupServiceConfigBuilder::default(),
            providers: Vec::new(),
            credentials: None,
        }
    }

    /// Use an existing registry instead of a fresh one.
    pub fn registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Backing store of the result cache.
    ///
    /// Default: in-process [`MemoryCacheStore`]
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Clock used for cache timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the full configuration.
    pub fn config(mut self, config: LookupServiceConfig) -> Self {
        self.config_builder = LookupServiceConfigBuilder { config };
        self
    }

    /// Default: 86 400 seconds
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config_builder = self.config_builder.cache_ttl(ttl);
        self
    }

    pub fn default_rate_limit(mut self, limit: RateLimit) -> Self {
        self.config_builder = self.config_builder.default_rate_limit(limit);
        self
    }

    pub fn provider_rate_limit(mut self, provider_id: impl Into<String>, limit: RateLimit) -> Self {
        self.config_builder = self.config_builder.provider_rate_limit(provider_id, limit);
        self
    }

    pub fn provider_priority<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_builder = self.config_builder.provider_priority(ids);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config_builder = self.config_builder.retry(retry);
        self
    }

    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.config_builder = self.config_builder.batch_concurrency(concurrency);
        self
    }

    /// Register a provider adapter under `id`.
    pub fn provider(mut self, id: impl Into<String>, provider: SharedProvider) -> Self {
        self.providers.push((id.into(), provider));
        self
    }

    /// Register the bundled adapters (per enabled feature), reading their
    /// credentials from `credentials`.
    pub fn default_providers(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build the LookupService.
    pub fn build(self) -> Result<LookupService, ConfigError> {
        let config = self.config_builder.build()?;

        let registry = self.registry.unwrap_or_else(|| {
            Arc::new(ProviderRegistry::with_snapshot_ttl(
                config.registry_snapshot_ttl,
            ))
        });

        if let Some(credentials) = &self.credentials {
            for (id, provider) in bundled_providers(credentials)? {
                registry.register(id, provider);
            }
        }
        for (id, provider) in self.providers {
            registry.register(id, provider);
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()));
        let mut cache = ResultCache::new(store, config.cache_ttl);
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }

        Ok(LookupService::new(registry, cache, config))
    }
}

fn bundled_providers(
    credentials: &Arc<dyn CredentialSource>,
) -> Result<Vec<(String, SharedProvider)>, ConfigError> {
    #[allow(unused_mut)]
    let mut providers: Vec<(String, SharedProvider)> = Vec::new();

    #[cfg(feature = "telnyx")]
    {
        use crate::providers::telnyx::{PROVIDER_ID, TelnyxClient, TelnyxProvider};
        let client = TelnyxClient::builder(Arc::clone(credentials))
            .build()
            .map_err(|e| ConfigError::invalid("providers.telnyx", e.to_string()))?;
        providers.push((PROVIDER_ID.to_string(), Arc::new(TelnyxProvider::new(client))));
    }

    #[cfg(feature = "twilio")]
    {
        use crate::providers::twilio::{PROVIDER_ID, TwilioClient, TwilioProvider};
        let client = TwilioClient::builder(Arc::clone(credentials))
            .build()
            .map_err(|e| ConfigError::invalid("providers.twilio", e.to_string()))?;
        providers.push((PROVIDER_ID.to_string(), Arc::new(TwilioProvider::new(client))));
    }

    #[cfg(not(any(feature = "telnyx", feature = "twilio")))]
    let _ = credentials;

    Ok(providers)
}
