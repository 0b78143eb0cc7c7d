//! Lookup orchestration: cache, provider selection, rate limiting and retry.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod options;
pub(crate) mod structure;
pub(crate) mod traits;

pub use config::{DEFAULT_PRIORITY, LookupServiceConfig, LookupServiceConfigBuilder};
pub use error::{ConfigError, LookupErrorKind, LookupServiceError};
pub use options::{BatchItem, BatchOptions, LookupOptions};
pub use structure::{LookupService, LookupServiceBuilder};
pub use traits::PhoneLookup;
