//! Integration tests against the real provider APIs.
//!
//! These tests make real API calls and require valid credentials.
//! They are ignored by default and should be run manually.
//!
//! # Setup
//!
//! 1. Copy the example env file:
//!    ```bash
//!    cp tests/.env.example tests/.env
//!    ```
//!
//! 2. Edit `tests/.env` and add your credentials
//!
//! 3. Run the tests:
//!    ```bash
//!    cargo test --test live_api -- --ignored
//!    ```
//!
//! **WARNING**: Every uncached lookup is billed by the provider!

use carrier_lookup::{
    EnvCredentials, LookupOptions, LookupProvider, LookupService, PhoneLookup, PhoneNumber,
    ProviderErrorKind, StaticCredentials,
};
use std::env;
use std::sync::Arc;

/// Number to look up, from `LOOKUP_TEST_NUMBER`.
fn test_number() -> String {
    dotenvy::from_filename("tests/.env").ok();
    dotenvy::dotenv().ok();

    env::var("LOOKUP_TEST_NUMBER").expect(
        "LOOKUP_TEST_NUMBER environment variable must be set.\n\
         Either:\n\
         1. Copy tests/.env.example to tests/.env and fill it in\n\
         2. Run with: LOOKUP_TEST_NUMBER=6175550100 cargo test --test live_api -- --ignored",
    )
}

#[cfg(feature = "telnyx")]
#[tokio::test]
#[ignore = "requires TELNYX_API_KEY and consumes API credits"]
async fn test_telnyx_live_lookup() {
    use carrier_lookup::telnyx::{TelnyxClient, TelnyxProvider};

    let number = PhoneNumber::parse(test_number()).unwrap();
    let client = TelnyxClient::builder(Arc::new(EnvCredentials)).build().unwrap();
    let provider = TelnyxProvider::new(client);
    assert!(provider.is_configured(), "TELNYX_API_KEY is not set");

    let result = provider.lookup(&number).await.unwrap();
    println!("Telnyx: {:#?}", result);
    assert_eq!(result.phone_number(), &number);
    assert_eq!(result.provider_id(), "telnyx");
}

#[cfg(feature = "telnyx")]
#[tokio::test]
#[ignore = "calls the Telnyx API"]
async fn test_telnyx_rejects_bad_key() {
    use carrier_lookup::telnyx::{TelnyxClient, TelnyxProvider};

    let number = PhoneNumber::parse(test_number()).unwrap();
    let provider = TelnyxProvider::new(TelnyxClient::with_api_key("KEY_invalid").unwrap());

    let err = provider.lookup(&number).await.unwrap_err();
    assert_eq!(err.kind(), ProviderErrorKind::Authentication);
}

#[cfg(feature = "twilio")]
#[tokio::test]
#[ignore = "requires TWILIO_ACCOUNT_SID/TWILIO_AUTH_TOKEN and consumes API credits"]
async fn test_twilio_live_lookup() {
    use carrier_lookup::twilio::{TwilioClient, TwilioProvider};

    let number = PhoneNumber::parse(test_number()).unwrap();
    let client = TwilioClient::builder(Arc::new(EnvCredentials)).build().unwrap();
    let provider = TwilioProvider::new(client);
    assert!(provider.is_configured(), "Twilio credentials are not set");

    let result = provider.lookup(&number).await.unwrap();
    println!("Twilio: {:#?}", result);
    assert_eq!(result.provider_id(), "twilio");
}

#[tokio::test]
#[ignore = "consumes API credits"]
async fn test_service_live_lookup_is_cached() {
    let raw = test_number();
    let service = LookupService::builder()
        .default_providers(Arc::new(EnvCredentials))
        .build()
        .unwrap();

    let first = service.lookup(&raw, &LookupOptions::default()).await.unwrap();
    println!("Service: {:#?}", first);
    let second = service.lookup(&raw, &LookupOptions::default()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(service.cache_stats().await.unwrap().total, 1);
}

#[tokio::test]
#[ignore = "reads tests/.env"]
async fn test_service_without_credentials_reports_configuration() {
    let raw = test_number();
    let service = LookupService::builder()
        .default_providers(Arc::new(StaticCredentials::new()))
        .build()
        .unwrap();

    let err = service.lookup(&raw, &LookupOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), carrier_lookup::LookupErrorKind::Configuration);
}
