//! Twilio provider implementation.

use super::client::TwilioClient;
use crate::providers::error::ProviderError;
use crate::providers::traits::LookupProvider;
use crate::types::{LookupResult, PhoneNumber};
use async_trait::async_trait;

#[cfg(feature = "tracing")]
use super::PROVIDER_ID;
#[cfg(feature = "tracing")]
use tracing::debug;

/// Twilio provider implementation.
///
/// This wraps the [`TwilioClient`] and implements the generic
/// [`LookupProvider`] trait.
#[derive(Debug, Clone)]
pub struct TwilioProvider {
    client: TwilioClient,
}

impl TwilioProvider {
    pub fn new(client: TwilioClient) -> Self {
        Self { client }
    }

    /// Get reference to the inner client.
    pub fn client(&self) -> &TwilioClient {
        &self.client
    }
}

#[async_trait]
impl LookupProvider for TwilioProvider {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioProvider::lookup",
            skip_all,
            fields(number = %number)
        )
    )]
    async fn lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
        let result = self.client.carrier_lookup(number).await?;

        #[cfg(feature = "tracing")]
        debug!(
            provider = PROVIDER_ID,
            line_type = %result.carrier_type(),
            "Twilio lookup succeeded"
        );

        Ok(result)
    }

    fn is_configured(&self) -> bool {
        self.client.account().is_some()
    }

    fn provider_name(&self) -> &str {
        "Twilio"
    }
}
