//! Telnyx provider implementation.

use super::client::TelnyxClient;
use crate::providers::error::ProviderError;
use crate::providers::traits::LookupProvider;
use crate::types::{LookupResult, PhoneNumber};
use async_trait::async_trait;

#[cfg(feature = "tracing")]
use super::PROVIDER_ID;
#[cfg(feature = "tracing")]
use tracing::debug;

/// Telnyx provider implementation.
///
/// This wraps the [`TelnyxClient`] and implements the generic
/// [`LookupProvider`] trait.
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::telnyx::{TelnyxClient, TelnyxProvider};
/// use carrier_lookup::{EnvCredentials, ProviderRegistry};
/// use std::sync::Arc;
///
/// let client = TelnyxClient::builder(Arc::new(EnvCredentials)).build()?;
/// let registry = ProviderRegistry::new();
/// registry.register("telnyx", Arc::new(TelnyxProvider::new(client)));
/// ```
#[derive(Debug, Clone)]
pub struct TelnyxProvider {
    client: TelnyxClient,
}

impl TelnyxProvider {
    pub fn new(client: TelnyxClient) -> Self {
        Self { client }
    }

    /// Get reference to the inner client.
    pub fn client(&self) -> &TelnyxClient {
        &self.client
    }
}

#[async_trait]
impl LookupProvider for TelnyxProvider {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TelnyxProvider::lookup",
            skip_all,
            fields(number = %number)
        )
    )]
    async fn lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
        let result = self.client.number_lookup(number).await?;

        #[cfg(feature = "tracing")]
        debug!(
            provider = PROVIDER_ID,
            line_type = %result.carrier_type(),
            "Telnyx lookup succeeded"
        );

        Ok(result)
    }

    fn is_configured(&self) -> bool {
        self.client.api_key().is_some()
    }

    fn provider_name(&self) -> &str {
        "Telnyx"
    }

    fn supports_batch(&self) -> bool {
        false
    }
}
