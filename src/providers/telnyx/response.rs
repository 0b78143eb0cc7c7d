//! Response parsing for the Telnyx number lookup API.
//!
//! Codes such as `spid` or `mobile_country_code` arrive as strings or
//! numbers depending on API version, and sections may be `null`, so every
//! field goes through the lenient readers.

use crate::providers::lenient::{lenient_bool, lenient_string, object_or_default};
use crate::types::{CarrierInfo, LineType, LookupResult, PhoneNumber};
use serde::Deserialize;

/// Success envelope: `{"data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct NumberLookupResponse {
    #[serde(default, deserialize_with = "object_or_default")]
    pub data: NumberLookupData,
}

#[derive(Debug, Default, Deserialize)]
pub struct NumberLookupData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub carrier: Option<CarrierData>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub portability: Option<PortabilityData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CarrierData {
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
    fn into_info(self) -> CarrierInfo {
        CarrierInfo {
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            line_type: self
                .line_type
                .as_deref()
                .map(LineType::from_provider)
                .unwrap_or_default(),
            mobile_country_code: self.mobile_country_code,
            mobile_network_code: self.mobile_network_code,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PortabilityData {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub portable: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ported: Option<bool>,
    /// `"Y"` / `"N"` flag used by newer API versions instead of `ported`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub ported_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub spid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ocn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub line_type: Option<String>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub previous_carrier: Option<CarrierData>,
}

impl PortabilityData {
    fn ported_flag(&self) -> Option<bool> {
        self.ported.or_else(|| match self.ported_status.as_deref()?.trim() {
            "Y" | "y" => Some(true),
            "N" | "n" => Some(false),
            _ => None,
        })
    }
}

/// Error envelope: `{"errors": [{"code": "...", "title": "...", "detail": "..."}]}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Best human readable message from an error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.errors.into_iter().next())
        .and_then(|e| e.detail.or(e.title))
        .unwrap_or_else(|| body.trim().to_string())
}

impl NumberLookupData {
    /// Map the payload onto a [`LookupResult`] for `number`.
    pub(crate) fn into_result(self, number: PhoneNumber, provider_id: &str) -> LookupResult {
        let portability = self.portability.unwrap_or_default();
        let ported = portability.ported_flag();
        let carrier = self.carrier.unwrap_or_default();
        let mcc = carrier.mobile_country_code.clone();
        let mnc = carrier.mobile_network_code.clone();

        let mut line_type = carrier
            .line_type
            .as_deref()
            .map(LineType::from_provider)
            .unwrap_or_default();
        if line_type == LineType::Unknown
            && let Some(raw) = portability.line_type.as_deref()
        {
            line_type = LineType::from_provider(raw);
        }

        let mut builder = LookupResult::builder(number, provider_id)
            .carrier_type(line_type)
            .portable(portability.portable)
            .ported(ported)
            .previous_carrier(portability.previous_carrier.map(CarrierData::into_info))
            .spid(portability.spid)
            .ocn(portability.ocn)
            .country_code(self.country_code)
            .mobile_codes(mcc, mnc);

        if let Some(name) = carrier.name {
            builder = builder.carrier_name(name);
        }

        builder.build()
    }
}
