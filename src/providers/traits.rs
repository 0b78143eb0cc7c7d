//! Provider trait definition.

use super::error::ProviderError;
use crate::types::{LookupResult, PhoneNumber};
use async_trait::async_trait;

/// Core trait that all lookup providers must implement.
///
/// A provider translates a normalized [`PhoneNumber`] into one request
/// against its remote API and maps the answer into the common
/// [`LookupResult`] / [`ProviderError`] model.
///
/// Providers are stored as `Arc<dyn LookupProvider>` in the
/// [`ProviderRegistry`](super::ProviderRegistry), so the trait is object safe.
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::{LookupProvider, LookupResult, PhoneNumber, ProviderError};
/// use async_trait::async_trait;
///
/// struct MyProvider { /* ... */ }
///
/// #[async_trait]
/// impl LookupProvider for MyProvider {
///     async fn lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
///         // Query the remote API once and classify the outcome
///     }
///
///     fn is_configured(&self) -> bool {
///         // Check credential presence, no network access
///     }
///
///     fn provider_name(&self) -> &str {
///         "My Provider"
///     }
/// }
/// ```
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Perform one logical lookup for `number`.
    ///
    /// Implementations surface exactly one classified outcome. Retrying
    /// is the caller's decision.
    async fn lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError>;

    /// Whether the credentials this provider needs are present.
    ///
    /// Must be cheap and side-effect free; it is never a network call.
    fn is_configured(&self) -> bool;

    /// Human readable provider name.
    fn provider_name(&self) -> &str;

    /// Whether the remote API accepts several numbers per request.
    ///
    /// Default implementation returns false.
    fn supports_batch(&self) -> bool {
        false
    }
}
