//! Response parsing for the Twilio Lookup v1 API.

use crate::providers::lenient::{lenient_string, object_or_default};
use crate::types::{LineType, LookupResult, PhoneNumber};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PhoneNumberResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub carrier: Option<CarrierData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CarrierData {
    /// Set when Twilio could not resolve the carrier. Numeric in practice,
    /// kept as a raw value so unexpected encodings still parse.
    #[serde(default)]
    pub error_code: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub line_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_network_code: Option<String>,
}

impl CarrierData {
    /// Carrier level error reported inside a 200 response.
    pub(crate) fn error(&self) -> Option<String> {
        match self.error_code.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Error body: `{"code": 20404, "message": "...", "status": 404}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            message: Some(message),
            code: Some(code),
        }) => format!("{} (code {})", message, code),
        Ok(ErrorResponse {
            message: Some(message),
            ..
        }) => message,
        _ => body.trim().to_string(),
    }
}

impl PhoneNumberResponse {
    pub(crate) fn into_result(self, number: PhoneNumber, provider_id: &str) -> LookupResult {
        let carrier = self.carrier.unwrap_or_default();
        let line_type = carrier
            .line_type
            .as_deref()
            .map(LineType::from_provider)
            .unwrap_or_default();

        let mut builder = LookupResult::builder(number, provider_id)
            .carrier_type(line_type)
            .country_code(self.country_code)
            .mobile_codes(carrier.mobile_country_code, carrier.mobile_network_code);

        if let Some(name) = carrier.name {
            builder = builder.carrier_name(name);
        }

        builder.build()
    }
}
