//! Telnyx HTTP client.

use super::response::{NumberLookupResponse, error_message};
use super::PROVIDER_ID;
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
use tracing::Span;
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Telnyx API base URL.
pub const DEFAULT_API_URL: &str = "https://api.telnyx.com/";

/// Telnyx HTTP client.
///
/// Speaks the Telnyx v2 number lookup API
/// (`GET /v2/number_lookup/{e164}?type=carrier`, bearer token). The API key
/// is fetched from the [`CredentialSource`] on every request.
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::telnyx::TelnyxClient;
/// use carrier_lookup::PhoneNumber;
///
/// let client = TelnyxClient::with_api_key("KEY...")?;
/// let number = PhoneNumber::parse("(617) 555-0100")?;
/// let result = client.number_lookup(&number).await?;
/// println!("Carrier: {:?}", result.carrier_name());
/// ```
#[derive(Clone)]
pub struct TelnyxClient {
    http_client: ClientWithMiddleware,
    credentials: Arc<dyn CredentialSource>,
    endpoint: Url,
}

impl std::fmt::Debug for TelnyxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnyxClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Builder for configuring a [`TelnyxClient`].
pub struct TelnyxClientBuilder {
    credentials: Arc<dyn CredentialSource>,
    endpoint: Option<Url>,
    http_client: Option<ClientWithMiddleware>,
    timeout: Duration,
}

impl TelnyxClientBuilder {
    /// Create a new builder reading credentials from `credentials`.
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

    /// Set the per-request timeout used by the default HTTP client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the [`TelnyxClient`].
    pub fn build(self) -> Result<TelnyxClient, ProviderError> {
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

        Ok(TelnyxClient {
            http_client,
            credentials: self.credentials,
            endpoint,
        })
    }
}

impl TelnyxClient {
    /// Create a client against `endpoint` with a fixed API key.
    pub fn new(endpoint: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let url = Url::parse(endpoint.as_ref()).map_err(|e| {
            ProviderError::configuration(PROVIDER_ID, format!("invalid API URL: {}", e))
        })?;
        Self::builder(Self::static_key(api_key)).endpoint(url).build()
    }

    /// Create a client with the default API URL and a fixed API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::builder(Self::static_key(api_key)).build()
    }

    /// Create a builder for configuring the client.
    pub fn builder(credentials: Arc<dyn CredentialSource>) -> TelnyxClientBuilder {
        TelnyxClientBuilder::new(credentials)
    }

    fn static_key(api_key: impl Into<String>) -> Arc<dyn CredentialSource> {
        Arc::new(StaticCredentials::new().with(PROVIDER_ID, Credentials::api_key(api_key)))
    }

    /// Current API key, if one is stored.
    pub(crate) fn api_key(&self) -> Option<SecretString> {
        match self.credentials.credential(PROVIDER_ID)? {
            Credentials::ApiKey(key) if !key.expose_secret().is_empty() => Some(key),
            _ => None,
        }
    }

    /// Build the lookup URL for `number`.
    fn build_request_url(&self, number: &PhoneNumber) -> Result<Url, ProviderError> {
        let mut url = self
            .endpoint
            .join(&format!("v2/number_lookup/{}", number.e164()))
            .map_err(|e| {
                ProviderError::configuration(PROVIDER_ID, format!("invalid lookup URL: {}", e))
            })?;

        let query = serde_urlencoded::to_string([("type", "carrier")]).map_err(|e| {
            ProviderError::configuration(PROVIDER_ID, format!("failed to encode query: {}", e))
        })?;
        url.set_query(Some(&query));

        Ok(url)
    }

    /// Look up carrier and portability data for `number`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TelnyxClient::number_lookup",
            skip_all,
            fields(number = %number, carrier = tracing::field::Empty)
        )
    )]
    pub async fn number_lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
        let api_key = self.api_key().ok_or_else(|| {
            ProviderError::configuration(PROVIDER_ID, "Telnyx API key is not configured")
        })?;

        let url = self.build_request_url(number)?;
        let request = self
            .http_client
            .get(url)
            .bearer_auth(api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json");

        let raw = http::execute(PROVIDER_ID, request).await?;

        if !raw.is_success() {
            return Err(ProviderError::from_status(
                PROVIDER_ID,
                raw.status,
                error_message(&raw.body),
                raw.retry_after,
            ));
        }

        let response: NumberLookupResponse = serde_json::from_str(&raw.body).map_err(|e| {
            ProviderError::lookup(
                PROVIDER_ID,
                format!("failed to parse response: {}", e),
                Some(raw.status),
            )
        })?;

        let result = response.data.into_result(number.clone(), PROVIDER_ID);

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("carrier", result.carrier_name().unwrap_or("unknown"))
                .set_status(Status::Ok);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::error::ProviderErrorKind;
    use crate::types::LineType;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn number() -> PhoneNumber {
        PhoneNumber::parse("(617) 555-0100").unwrap()
    }

    #[tokio::test]
    async fn test_number_lookup_success() {
        let mock_server = MockServer::start().await;

        let response_body = serde_json::json!({
            "data": {
                "phone_number": "+16175550100",
                "country_code": "US",
                "carrier": {"name": "Verizon Wireless", "type": "mobile"},
                "portability": {"portable": true, "ported": false, "spid": "6006", "ocn": "6006"}
            }
        });

        Mock::given(method("GET"))
            .and(path("/v2/number_lookup/+16175550100"))
            .and(query_param("type", "carrier"))
            .and(header("authorization", "Bearer test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TelnyxClient::new(mock_server.uri(), "test_key").unwrap();
        let result = client.number_lookup(&number()).await.unwrap();

        assert_eq!(result.phone_number().as_str(), "6175550100");
        assert_eq!(result.carrier_name(), Some("Verizon Wireless"));
        assert_eq!(result.carrier_type(), LineType::Mobile);
        assert_eq!(result.ported(), Some(false));
        assert_eq!(result.ocn(), Some("6006"));
        assert_eq!(result.provider_id(), "telnyx");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (401, ProviderErrorKind::Authentication),
            (404, ProviderErrorKind::Lookup),
            (422, ProviderErrorKind::Lookup),
            (429, ProviderErrorKind::RateLimit),
            (503, ProviderErrorKind::Network),
        ];

        for (status, expected) in cases {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                    "errors": [{"code": "1", "title": "Error", "detail": "detail text"}]
                })))
                .mount(&mock_server)
                .await;

            let client = TelnyxClient::new(mock_server.uri(), "test_key").unwrap();
            let err = client.number_lookup(&number()).await.unwrap_err();
            assert_eq!(err.kind(), expected, "status {}", status);
            assert_eq!(err.provider(), "telnyx");
            assert!(err.message().contains("detail text"));
        }
    }

    #[tokio::test]
    async fn test_rate_limit_retry_after() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "3")
                    .set_body_string("slow down"),
            )
            .mount(&mock_server)
            .await;

        let client = TelnyxClient::new(mock_server.uri(), "test_key").unwrap();
        match client.number_lookup(&number()).await {
            Err(ProviderError::RateLimited { retry_after, .. }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("expected rate limit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_lookup_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = TelnyxClient::new(mock_server.uri(), "test_key").unwrap();
        let err = client.number_lookup(&number()).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Lookup);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = TelnyxClient::builder(Arc::new(StaticCredentials::new()))
            .build()
            .unwrap();
        let err = client.number_lookup(&number()).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Configuration);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = TelnyxClient::with_api_key("super-secret").unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }
}
