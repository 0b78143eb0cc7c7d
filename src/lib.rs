//! # Carrier Lookup
//!
//! Carrier, line type and number portability lookups for North American
//! phone numbers, with provider abstraction, fallback, caching and rate
//! limiting.
//!
//! The crate sits between a caller (CLI, batch job, service) and the remote
//! lookup APIs. Callers hand in raw numbers; the [`LookupService`] normalizes
//! them, answers from the cache when it can, and otherwise picks a
//! configured provider, waits for a rate limiter token and calls the
//! provider with retry on transient errors.
//!
//! ## Supported Providers
//!
//! | Provider | Feature | Website |
//! |----------|---------|---------|
//! | Telnyx | `telnyx` (default) | <https://telnyx.com> |
//! | Twilio Lookup | `twilio` (default) | <https://www.twilio.com/lookup> |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carrier_lookup::{
//!     BatchOptions, EnvCredentials, LookupOptions, LookupService, PhoneLookup,
//!     SqliteCacheStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteCacheStore::open("lookup_cache.db").await?;
//!     let service = LookupService::builder()
//!         .cache_store(Arc::new(store))
//!         .default_providers(Arc::new(EnvCredentials))
//!         .build()?;
//!
//!     let result = service.lookup("(617) 555-0100", &LookupOptions::default()).await?;
//!     println!("{:?} ({})", result.carrier_name(), result.carrier_type());
//!
//!     let items = service
//!         .batch_lookup(&["617-555-0100", "212 555 0199"], &BatchOptions::default())
//!         .await;
//!     for item in items {
//!         println!("{}: {:?}", item.input, item.outcome.map(|r| r.provider_id().to_string()));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! LookupService
//!     │
//!     ├── ResultCache ──► CacheStore (SQLite / memory)
//!     ├── ProviderRegistry (priority, fallback)
//!     ├── RateLimiter (token bucket per provider)
//!     ▼
//! LookupProvider  (trait: TelnyxProvider, TwilioProvider, ...)
//! ```
//!
//! ## Features
//!
//! - `telnyx` - Telnyx number lookup adapter (enabled by default)
//! - `twilio` - Twilio Lookup adapter (enabled by default)
//! - `tracing` - OpenTelemetry tracing instrumentation (enabled by default)

pub mod cache;
pub mod credentials;
pub mod errors;
pub mod providers;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use cache::{
    CacheError, CacheStats, CacheStore, ManualClock, MemoryCacheStore, ResultCache,
    SqliteCacheStore,
};
pub use credentials::{CredentialSource, Credentials, EnvCredentials, StaticCredentials};
pub use errors::RetryableError;
pub use providers::{
    LookupProvider, ProviderDescriptor, ProviderError, ProviderErrorKind, ProviderRegistry,
    SharedProvider,
};
pub use service::{
    BatchItem, BatchOptions, ConfigError, LookupErrorKind, LookupOptions, LookupService,
    LookupServiceBuilder, LookupServiceConfig, LookupServiceError, PhoneLookup,
};
pub use types::{CarrierInfo, LineType, LookupResult, PhoneNumber, PhoneNumberError};
pub use utils::{RateLimit, RateLimiter, RetryConfig};

// Re-export provider modules for convenience
#[cfg(feature = "telnyx")]
pub use providers::telnyx;
#[cfg(feature = "twilio")]
pub use providers::twilio;

pub use tokio_util::sync::CancellationToken;
