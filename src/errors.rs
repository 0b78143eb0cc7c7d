//! Retry classification shared by provider and service errors.

use std::time::Duration;

/// Trait for errors that can be classified as transient or permanent.
///
/// The lookup service consults this trait to decide whether a failed
/// provider call is worth another attempt. Only transient conditions
/// (network failures, remote backpressure) should report `true`;
/// credential problems and business errors such as an unknown number
/// will not change on retry.
///
/// # Examples
///
/// ```rust
/// use carrier_lookup::RetryableError;
/// use std::time::Duration;
///
/// enum MyError {
///     Timeout,
///     Throttled { wait: Duration },
///     BadCredentials,
/// }
///
/// impl RetryableError for MyError {
///     fn is_retryable(&self) -> bool {
///         matches!(self, MyError::Timeout | MyError::Throttled { .. })
///     }
///
///     fn retry_after(&self) -> Option<Duration> {
///         match self {
///             MyError::Throttled { wait } => Some(*wait),
///             _ => None,
///         }
///     }
/// }
///
/// assert!(MyError::Timeout.is_retryable());
/// assert!(!MyError::BadCredentials.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error represents a transient failure
    /// that might succeed when the same request is sent again.
    fn is_retryable(&self) -> bool;

    /// Minimum delay the remote side asked for before the next attempt.
    ///
    /// Default implementation returns `None`, leaving the delay to the
    /// configured backoff strategy.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
