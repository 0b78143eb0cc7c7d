//! Core types for carrier lookups.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// PhoneNumber
// =============================================================================

/// Error when normalizing a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneNumberError {
    /// Input was empty or whitespace.
    #[error("phone number cannot be empty")]
    Empty,
    /// Input contains characters other than digits and separators.
    #[error("phone number '{input}' contains invalid characters")]
    InvalidCharacters { input: String },
    /// Input does not reduce to a 10-digit NANP number.
    #[error("phone number '{input}' must have 10 digits (optionally prefixed with +1)")]
    InvalidLength { input: String },
}

/// Accepted layouts: optional `+1`/`1` prefix, optional parentheses around
/// the area code, and spaces, dots or dashes between groups.
static NANP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\+?1[ \t.\-]*)?(?:\(([0-9]{3})\)|([0-9]{3}))[ \t.\-]*([0-9]{3})[ \t.\-]*([0-9]{4})$",
    )
    .expect("NANP pattern is valid")
});

/// A North American phone number in canonical 10-digit form.
///
/// The only way to obtain a `PhoneNumber` is through normalization, so a
/// value of this type is always exactly ten ASCII digits. The canonical form
/// doubles as the cache key.
///
/// # Example
///
/// ```rust
/// use carrier_lookup::PhoneNumber;
///
/// let a = PhoneNumber::parse("(617) 555-0100").unwrap();
/// let b = PhoneNumber::parse("+1 617.555.0100").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "6175550100");
/// assert_eq!(a.e164(), "+16175550100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize raw user input into canonical form.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, PhoneNumberError> {
        let input = raw.as_ref().trim();
        if input.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        if let Some(caps) = NANP_PATTERN.captures(input)
            && let Some(area) = caps.get(1).or_else(|| caps.get(2))
        {
            return Ok(Self(format!("{}{}{}", area.as_str(), &caps[3], &caps[4])));
        }

        let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+');
        if !input.chars().all(allowed) {
            return Err(PhoneNumberError::InvalidCharacters {
                input: input.to_string(),
            });
        }

        Err(PhoneNumberError::InvalidLength {
            input: input.to_string(),
        })
    }

    /// Canonical 10-digit form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// E.164 form with the NANP country code (`+1XXXXXXXXXX`).
    pub fn e164(&self) -> String {
        format!("+1{}", self.0)
    }

    /// Three-digit area code.
    pub fn area_code(&self) -> &str {
        &self.0[..3]
    }
}

impl FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        PhoneNumber::parse(raw).map_err(de::Error::custom)
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

// =============================================================================
// LineType
// =============================================================================

/// Kind of line behind a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Mobile,
    Landline,
    Voip,
    #[default]
    Unknown,
}

impl LineType {
    /// Map a provider-reported type string onto the common set.
    ///
    /// Matching is case-insensitive; `fixed line` and `fixed` count as
    /// landline. Anything unrecognised is [`LineType::Unknown`].
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mobile" | "wireless" | "cellular" => Self::Mobile,
            "landline" | "fixed line" | "fixed" | "fixed_line" => Self::Landline,
            "voip" | "non-fixed voip" | "fixed voip" => Self::Voip,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Landline => "landline",
            Self::Voip => "voip",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for LineType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CarrierInfo
// =============================================================================

/// Carrier details as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierInfo {
    /// Carrier name.
    pub name: String,
    /// Line type served by this carrier.
    pub line_type: LineType,
    /// Mobile country code, when the carrier is a mobile network.
    pub mobile_country_code: Option<String>,
    /// Mobile network code, when the carrier is a mobile network.
    pub mobile_network_code: Option<String>,
}

impl CarrierInfo {
    pub fn new(name: impl Into<String>, line_type: LineType) -> Self {
        Self {
            name: name.into(),
            line_type,
            mobile_country_code: None,
            mobile_network_code: None,
        }
    }
}

// =============================================================================
// LookupResult
// =============================================================================

/// Outcome of a successful carrier lookup.
///
/// Results are produced by provider adapters and never modified afterwards;
/// a fresher answer requires a new lookup. Fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    phone_number: PhoneNumber,
    carrier_name: Option<String>,
    carrier_type: LineType,
    portable: Option<bool>,
    ported: Option<bool>,
    previous_carrier: Option<CarrierInfo>,
    spid: Option<String>,
    ocn: Option<String>,
    country_code: Option<String>,
    mobile_country_code: Option<String>,
    mobile_network_code: Option<String>,
    provider_id: String,
    obtained_at: DateTime<Utc>,
}

impl LookupResult {
    /// Start building a result for `phone_number` produced by `provider_id`.
    pub fn builder(phone_number: PhoneNumber, provider_id: impl Into<String>) -> LookupResultBuilder {
        LookupResultBuilder::new(phone_number, provider_id)
    }

    pub fn phone_number(&self) -> &PhoneNumber {
        &self.phone_number
    }

    pub fn carrier_name(&self) -> Option<&str> {
        self.carrier_name.as_deref()
    }

    pub fn carrier_type(&self) -> LineType {
        self.carrier_type
    }

    /// Whether the number can be ported. `None` when the provider did not say.
    pub fn portable(&self) -> Option<bool> {
        self.portable
    }

    /// Whether the number has been ported. `None` when the provider did not say.
    pub fn ported(&self) -> Option<bool> {
        self.ported
    }

    pub fn previous_carrier(&self) -> Option<&CarrierInfo> {
        self.previous_carrier.as_ref()
    }

    pub fn spid(&self) -> Option<&str> {
        self.spid.as_deref()
    }

    pub fn ocn(&self) -> Option<&str> {
        self.ocn.as_deref()
    }

    /// ISO country code reported by the provider.
    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn mobile_country_code(&self) -> Option<&str> {
        self.mobile_country_code.as_deref()
    }

    pub fn mobile_network_code(&self) -> Option<&str> {
        self.mobile_network_code.as_deref()
    }

    /// Id of the provider that produced this result.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

/// Builder for [`LookupResult`].
#[derive(Debug, Clone)]
pub struct LookupResultBuilder {
    result: LookupResult,
}

impl LookupResultBuilder {
    fn new(phone_number: PhoneNumber, provider_id: impl Into<String>) -> Self {
        Self {
            result: LookupResult {
                phone_number,
                carrier_name: None,
                carrier_type: LineType::Unknown,
                portable: None,
                ported: None,
                previous_carrier: None,
                spid: None,
                ocn: None,
                country_code: None,
                mobile_country_code: None,
                mobile_network_code: None,
                provider_id: provider_id.into(),
                obtained_at: Utc::now(),
            },
        }
    }

    pub fn carrier_name(mut self, name: impl Into<String>) -> Self {
        self.result.carrier_name = Some(name.into());
        self
    }

    pub fn carrier_type(mut self, line_type: LineType) -> Self {
        self.result.carrier_type = line_type;
        self
    }

    pub fn portable(mut self, portable: Option<bool>) -> Self {
        self.result.portable = portable;
        self
    }

    pub fn ported(mut self, ported: Option<bool>) -> Self {
        self.result.ported = ported;
        self
    }

    pub fn previous_carrier(mut self, carrier: Option<CarrierInfo>) -> Self {
        self.result.previous_carrier = carrier;
        self
    }

    pub fn spid(mut self, spid: Option<String>) -> Self {
        self.result.spid = spid;
        self
    }

    pub fn ocn(mut self, ocn: Option<String>) -> Self {
        self.result.ocn = ocn;
        self
    }

    pub fn country_code(mut self, country_code: Option<String>) -> Self {
        self.result.country_code = country_code;
        self
    }

    pub fn mobile_codes(mut self, mcc: Option<String>, mnc: Option<String>) -> Self {
        self.result.mobile_country_code = mcc;
        self.result.mobile_network_code = mnc;
        self
    }

    /// Override the acquisition timestamp (defaults to the builder's creation time).
    pub fn obtained_at(mut self, at: DateTime<Utc>) -> Self {
        self.result.obtained_at = at;
        self
    }

    pub fn build(self) -> LookupResult {
        self.result
    }
}
