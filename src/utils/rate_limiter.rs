//! Per-provider token bucket rate limiting.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Request budget of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RateLimit {
    /// Sustained refill rate.
    pub requests_per_second: f64,
    /// Bucket capacity, i.e. how many requests may go out back to back.
    #[serde(default = "RateLimit::default_burst")]
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: Self::default_burst(),
        }
    }
}

impl RateLimit {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
        }
    }

    fn default_burst() -> u32 {
        2
    }

    /// Rate is finite and positive and the bucket holds at least one token.
    pub fn is_valid(&self) -> bool {
        self.requests_per_second.is_finite() && self.requests_per_second > 0.0 && self.burst >= 1
    }
}

/// A wait for a token was abandoned because the caller cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limiter wait cancelled")]
pub struct AcquireCancelled;

/// Resolves when `cancel` fires, never when it is `None`.
pub(crate) async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket guarding one provider.
///
/// The state lock is held while a caller waits for its token, so waiters
/// are served one at a time in lock order.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(limit: RateLimit) -> Self {
        let capacity = f64::from(limit.burst.max(1));
        Self {
            capacity,
            refill_rate: limit.requests_per_second,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Tokens currently available, after refilling.
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    /// Take one token, sleeping until one is available.
    ///
    /// Only the final step consumes, so dropping this future part way
    /// leaves the bucket untouched.
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens < 1.0 {
            // Vanishingly small rates overflow `Duration`; such a wait never ends.
            let wait = Duration::try_from_secs_f64((1.0 - state.tokens) / self.refill_rate)
                .unwrap_or(Duration::MAX);

            #[cfg(feature = "tracing")]
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for token");

            tokio::time::sleep(wait).await;
            self.refill(&mut state);
            // Float rounding can leave the refill a hair short of one token.
            state.tokens = state.tokens.max(1.0);
        }

        state.tokens -= 1.0;
    }

    /// [`wait`](Self::wait) that gives up when `cancel` fires.
    pub async fn acquire(&self, cancel: Option<&CancellationToken>) -> Result<(), AcquireCancelled> {
        tokio::select! {
            biased;
            _ = cancelled(cancel) => Err(AcquireCancelled),
            _ = self.wait() => Ok(()),
        }
    }
}

/// Rate limiter holding one [`TokenBucket`] per provider id.
///
/// Buckets are created lazily from the default limit or a per-provider
/// override. Different providers never contend on the same lock.
#[derive(Debug)]
pub struct RateLimiter {
    default_limit: RateLimit,
    overrides: HashMap<String, RateLimit>,
    buckets: StdMutex<HashMap<String, Arc<TokenBucket>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimit::default(), HashMap::new())
    }
}

impl RateLimiter {
    pub fn new(default_limit: RateLimit, overrides: HashMap<String, RateLimit>) -> Self {
        Self {
            default_limit,
            overrides,
            buckets: StdMutex::new(HashMap::new()),
        }
    }

    /// Limit applied to `provider_id`.
    pub fn limit_for(&self, provider_id: &str) -> RateLimit {
        self.overrides
            .get(provider_id)
            .copied()
            .unwrap_or(self.default_limit)
    }

    /// Bucket for `provider_id`, created on first use.
    pub fn bucket(&self, provider_id: &str) -> Arc<TokenBucket> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buckets
            .entry(provider_id.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(self.limit_for(provider_id))))
            .clone()
    }

    /// Take one token from the bucket of `provider_id`.
    pub async fn wait(&self, provider_id: &str) {
        self.bucket(provider_id).wait().await
    }

    /// Like [`wait`](Self::wait), aborted by `cancel`.
    pub async fn acquire(
        &self,
        provider_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), AcquireCancelled> {
        let bucket = self.bucket(provider_id);
        bucket.acquire(cancel).await
    }
}
