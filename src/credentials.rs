//! Credential sources consumed by provider adapters.
//!
//! Adapters never store credentials themselves. They ask a
//! [`CredentialSource`] on every call, so rotating or removing a secret
//! takes effect without rebuilding the adapter.

use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Credentials for one provider.
#[derive(Clone)]
pub enum Credentials {
    /// Single bearer token or API key.
    ApiKey(SecretString),
    /// Username/password pair (HTTP basic auth).
    Basic {
        username: String,
        password: SecretString,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Source of provider credentials.
///
/// Lookups must be cheap and free of side effects: adapters call this from
/// `is_configured`, which the registry polls when computing provider status.
pub trait CredentialSource: Send + Sync {
    /// Credentials for `provider_id`, or `None` when nothing is stored.
    fn credential(&self, provider_id: &str) -> Option<Credentials>;
}

/// Reads credentials from environment variables.
///
/// | Provider | Variables |
/// |----------|-----------|
/// | `telnyx` | `TELNYX_API_KEY` |
/// | `twilio` | `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN` |
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl CredentialSource for EnvCredentials {
    fn credential(&self, provider_id: &str) -> Option<Credentials> {
        match provider_id {
            "telnyx" => Self::var("TELNYX_API_KEY").map(Credentials::api_key),
            "twilio" => {
                let sid = Self::var("TWILIO_ACCOUNT_SID")?;
                let token = Self::var("TWILIO_AUTH_TOKEN")?;
                Some(Credentials::basic(sid, token))
            }
            _ => None,
        }
    }
}

/// In-memory credential store, useful for tests and for callers that load
/// secrets from their own storage.
#[derive(Default)]
pub struct StaticCredentials {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("StaticCredentials")
            .field("providers", &ids)
            .finish()
    }
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, provider_id: impl Into<String>, credentials: Credentials) -> Self {
        self.set(provider_id, credentials);
        self
    }

    pub fn set(&self, provider_id: impl Into<String>, credentials: Credentials) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(provider_id.into(), credentials);
    }

    /// Remove stored credentials. Returns true when something was removed.
    pub fn remove(&self, provider_id: &str) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(provider_id).is_some()
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self, provider_id: &str) -> Option<Credentials> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(provider_id).cloned()
    }
}
