//! Telnyx provider implementation.
//!
//! This module provides integration with the Telnyx number lookup API
//! (carrier, line type and portability data).
//!
//! # Example
//!
//! ```rust,ignore
//! use carrier_lookup::telnyx::{TelnyxClient, TelnyxProvider};
//! use carrier_lookup::{LookupProvider, PhoneNumber};
//!
//! let client = TelnyxClient::with_api_key("your_api_key")?;
//! let provider = TelnyxProvider::new(client);
//!
//! let number = PhoneNumber::parse("(617) 555-0100")?;
//! let result = provider.lookup(&number).await?;
//! println!("{:?} ({})", result.carrier_name(), result.carrier_type());
//! ```

pub mod client;
pub mod provider;
mod response;

/// Registry id and credential key of this provider.
pub const PROVIDER_ID: &str = "telnyx";

// Re-export commonly used types
pub use client::{TelnyxClient, TelnyxClientBuilder};
pub use provider::TelnyxProvider;
