//! Lookup provider contract, registry and the bundled adapters.

pub(crate) mod error;
pub(crate) mod http;
#[cfg(any(feature = "telnyx", feature = "twilio"))]
pub(crate) mod lenient;
pub(crate) mod registry;
pub(crate) mod traits;

#[cfg(feature = "telnyx")]
pub mod telnyx;

#[cfg(feature = "twilio")]
pub mod twilio;

pub use error::{ProviderError, ProviderErrorKind};
pub use registry::{
    DEFAULT_SNAPSHOT_TTL, ProviderDescriptor, ProviderRegistry, REGISTRY_ID, ResolvedProvider,
    SharedProvider,
};
pub use traits::LookupProvider;
