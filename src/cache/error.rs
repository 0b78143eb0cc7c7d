//! Cache error types.

use thiserror::Error;

/// Errors raised by cache stores.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed.
    #[error("cache storage error: {0}")]
    Storage(String),

    /// A result could not be encoded for storage.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database could not be opened.
    #[error("failed to open cache database: {0}")]
    Open(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
