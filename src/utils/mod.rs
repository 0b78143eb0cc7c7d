//! Retry and rate limiting helpers.

pub(crate) mod rate_limiter;
pub(crate) mod retry;

pub use rate_limiter::{AcquireCancelled, RateLimit, RateLimiter, TokenBucket};
pub use retry::RetryConfig;
