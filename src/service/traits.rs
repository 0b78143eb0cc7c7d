//! Service trait definition.

use super::options::{BatchItem, BatchOptions, LookupOptions};
use crate::errors::RetryableError;
use crate::types::LookupResult;
use std::error::Error as StdError;

/// Trait for phone lookup service implementations.
///
/// This trait abstracts the service interface so front ends (CLI, batch
/// jobs) can be tested against a fake.
pub trait PhoneLookup: Send + Sync {
    /// The error type for this service.
    type Error: StdError + RetryableError;

    /// Look up one number.
    ///
    /// # Arguments
    ///
    /// * `number` - Raw input in any supported NANP format
    /// * `options` - Cache use, explicit provider and cancellation
    async fn lookup(&self, number: &str, options: &LookupOptions)
    -> Result<LookupResult, Self::Error>;

    /// Look up many numbers.
    ///
    /// Returns exactly one item per input, in input order. A failing item
    /// never aborts the others.
    async fn batch_lookup<S>(&self, numbers: &[S], options: &BatchOptions) -> Vec<BatchItem<Self::Error>>
    where
        S: AsRef<str> + Sync;
}
