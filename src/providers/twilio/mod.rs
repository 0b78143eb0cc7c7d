//! Twilio provider implementation.
//!
//! Integration with the Twilio Lookup v1 API (carrier and line type).
//!
//! # Example
//!
//! ```rust,ignore
//! use carrier_lookup::twilio::{TwilioClient, TwilioProvider};
//!
//! let client = TwilioClient::with_credentials("ACxxxxxxxx", "auth_token")?;
//! let provider = TwilioProvider::new(client);
//! ```

pub mod client;
pub mod provider;
mod response;

/// Registry id and credential key of this provider.
pub const PROVIDER_ID: &str = "twilio";

pub use client::{TwilioClient, TwilioClientBuilder};
pub use provider::TwilioProvider;
