//! HTTP plumbing shared by the provider clients.

use super::error::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status, backoff hint and body of a completed request.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Build the default middleware client used when none is supplied.
pub(crate) fn default_http_client(
    provider: &str,
    timeout: Duration,
) -> Result<ClientWithMiddleware, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ProviderError::configuration(provider, format!("failed to build HTTP client: {}", e))
        })?;
    Ok(ClientBuilder::new(client).build())
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Send a request and read the full body.
///
/// Transport failures, timeouts and unreadable bodies are network errors;
/// HTTP status handling is left to the caller.
pub(crate) async fn execute(
    provider: &str,
    request: RequestBuilder,
) -> Result<RawResponse, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::network(provider, format!("request failed: {}", e)))?;

    let status = response.status().as_u16();
    let retry_after = retry_after(response.headers());
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(provider, format!("failed to read response: {}", e)))?;

    Ok(RawResponse {
        status,
        retry_after,
        body,
    })
}
