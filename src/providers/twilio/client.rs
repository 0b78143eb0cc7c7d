//! Twilio HTTP client.

use super::PROVIDER_ID;
use super::response::{PhoneNumberResponse, error_message};
use crate::credentials::{CredentialSource, Credentials, StaticCredentials};
use crate::providers::error::ProviderError;
use crate::providers::http::{self, DEFAULT_TIMEOUT};
use crate::types::{LookupResult, PhoneNumber};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, warn};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Twilio Lookup API base URL.
pub const DEFAULT_API_URL: &str = "https://lookups.twilio.com/";

/// Backoff assumed when a 429 arrives without a `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Twilio HTTP client.
///
/// Uses Lookup v1 (`GET /v1/PhoneNumbers/{e164}?Type=carrier`) with HTTP
/// basic auth (account SID and auth token).
#[derive(Clone)]
pub struct TwilioClient {
    http_client: ClientWithMiddleware,
    credentials: Arc<dyn CredentialSource>,
    endpoint: Url,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

/// Builder for configuring a [`TwilioClient`].
pub struct TwilioClientBuilder {
    credentials: Arc<dyn CredentialSource>,
    endpoint: Option<Url>,
    http_client: Option<ClientWithMiddleware>,
    timeout: Duration,
}

impl TwilioClientBuilder {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            credentials,
            endpoint: None,
            http_client: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API base URL.
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set a custom HTTP client with middleware.
    pub fn http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<TwilioClient, ProviderError> {
        let endpoint = match self.endpoint {
            Some(url) => url,
            None => Url::parse(DEFAULT_API_URL).map_err(|e| {
                ProviderError::configuration(PROVIDER_ID, format!("invalid API URL: {}", e))
            })?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => http::default_http_client(PROVIDER_ID, self.timeout)?,
        };

        Ok(TwilioClient {
            http_client,
            credentials: self.credentials,
            endpoint,
        })
    }
}

impl TwilioClient {
    /// Create a client against `endpoint` with a fixed SID/token pair.
    pub fn new(
        endpoint: impl AsRef<str>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let url = Url::parse(endpoint.as_ref()).map_err(|e| {
            ProviderError::configuration(PROVIDER_ID, format!("invalid API URL: {}", e))
        })?;
        Self::builder(Self::static_pair(account_sid, auth_token))
            .endpoint(url)
            .build()
    }

    /// Create a client with the default API URL and a fixed SID/token pair.
    pub fn with_credentials(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::builder(Self::static_pair(account_sid, auth_token)).build()
    }

    pub fn builder(credentials: Arc<dyn CredentialSource>) -> TwilioClientBuilder {
        TwilioClientBuilder::new(credentials)
    }

    fn static_pair(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Arc<dyn CredentialSource> {
        Arc::new(
            StaticCredentials::new().with(PROVIDER_ID, Credentials::basic(account_sid, auth_token)),
        )
    }

    /// Account SID and auth token, when both are present and non-empty.
    pub(crate) fn account(&self) -> Option<(String, SecretString)> {
        match self.credentials.credential(PROVIDER_ID)? {
            Credentials::Basic { username, password }
                if !username.is_empty() && !password.expose_secret().is_empty() =>
            {
                Some((username, password))
            }
            _ => None,
        }
    }

    fn build_request_url(&self, number: &PhoneNumber) -> Result<Url, ProviderError> {
        let mut url = self
            .endpoint
            .join(&format!("v1/PhoneNumbers/{}", number.e164()))
            .map_err(|e| {
                ProviderError::configuration(PROVIDER_ID, format!("invalid lookup URL: {}", e))
            })?;

        let query = serde_urlencoded::to_string([("Type", "carrier")]).map_err(|e| {
            ProviderError::configuration(PROVIDER_ID, format!("failed to encode query: {}", e))
        })?;
        url.set_query(Some(&query));

        Ok(url)
    }

    /// Look up carrier data for `number`.
    ///
    /// Twilio v1 carries no portability data, so `ported`, `spid` and `ocn`
    /// stay empty on the result.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::carrier_lookup",
            skip_all,
            fields(number = %number, carrier = tracing::field::Empty)
        )
    )]
    pub async fn carrier_lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
        let (account_sid, auth_token) = self.account().ok_or_else(|| {
            ProviderError::configuration(PROVIDER_ID, "Twilio account SID or auth token is not configured")
        })?;

        let url = self.build_request_url(number)?;
        let request = self
            .http_client
            .get(url)
            .basic_auth(account_sid, Some(auth_token.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json");

        let raw = http::execute(PROVIDER_ID, request).await?;

        if !raw.is_success() {
            let retry_after = match raw.status {
                429 => raw.retry_after.or(Some(DEFAULT_RETRY_AFTER)),
                _ => raw.retry_after,
            };
            return Err(ProviderError::from_status(
                PROVIDER_ID,
                raw.status,
                error_message(&raw.body),
                retry_after,
            ));
        }

        let response: PhoneNumberResponse = serde_json::from_str(&raw.body).map_err(|e| {
            ProviderError::lookup(
                PROVIDER_ID,
                format!("failed to parse response: {}", e),
                Some(raw.status),
            )
        })?;

        if let Some(code) = response.carrier.as_ref().and_then(|c| c.error()) {
            #[cfg(feature = "tracing")]
            warn!(error_code = %code, "Twilio reported a carrier error");

            return Err(ProviderError::lookup(
                PROVIDER_ID,
                format!("carrier lookup failed with error code {}", code),
                Some(raw.status),
            ));
        }

        let result = response.into_result(number.clone(), PROVIDER_ID);

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("carrier", result.carrier_name().unwrap_or("unknown"))
                .set_status(Status::Ok);
        }

        Ok(result)
    }
}
