//! TTL enforcing result cache.

use super::clock::{Clock, SystemClock};
use super::error::CacheError;
use super::store::{CacheStore, StoredEntry};
use crate::types::{LookupResult, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Default time-to-live of a cached result (one day).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total: u64,
    pub valid: u64,
    pub expired: u64,
    /// Sum of serialized payload sizes.
    pub size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub ttl_seconds: u64,
}

/// A key in the cache with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentEntry {
    pub phone_number: String,
    pub stored_at: DateTime<Utc>,
}

/// Result cache keyed by normalized phone number.
///
/// An entry is served while `now - stored_at <= ttl`. The TTL is read on
/// every call, so [`set_ttl`](Self::set_ttl) applies to entries that are
/// already stored. Expired rows stay in the store until
/// [`clear_expired`](Self::clear_expired) runs, but are never returned.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: Arc<AtomicU64>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ttl_ms: Arc::new(AtomicU64::new(duration_ms(ttl))),
        }
    }

    /// Replace the clock used for timestamps and expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms.store(duration_ms(ttl), Ordering::Relaxed);
    }

    /// Entries stored strictly before this instant are expired.
    fn cutoff(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::milliseconds(
            i64::try_from(self.ttl_ms.load(Ordering::Relaxed)).unwrap_or(i64::MAX),
        );
        self.clock
            .now()
            .checked_sub_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Cached result for `number`, if present and fresh.
    ///
    /// Storage failures and undecodable payloads are logged and reported as
    /// a miss.
    pub async fn get(&self, number: &PhoneNumber) -> Option<LookupResult> {
        let entry = match self.store.get(number.as_str()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(number = %number, error = %_e, "Cache read failed, treating as miss");
                return None;
            }
        };

        if entry.stored_at < self.cutoff() {
            #[cfg(feature = "tracing")]
            debug!(number = %number, stored_at = %entry.stored_at, "Cache entry expired");
            return None;
        }

        match serde_json::from_slice::<LookupResult>(&entry.payload) {
            Ok(result) => Some(result),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(number = %number, error = %_e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    /// Store `result` under its phone number, overwriting any previous entry.
    pub async fn put(&self, result: &LookupResult) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(result)?;
        self.store
            .put(StoredEntry {
                key: result.phone_number().as_str().to_string(),
                payload,
                stored_at: self.clock.now(),
            })
            .await
    }

    /// Drop the entry for `number`.
    pub async fn remove(&self, number: &PhoneNumber) -> Result<bool, CacheError> {
        self.store.delete(number.as_str()).await
    }

    /// Remove every entry. Returns the number removed.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        self.store.clear().await
    }

    /// Remove exactly the expired entries. Returns the number removed.
    pub async fn clear_expired(&self) -> Result<u64, CacheError> {
        let removed = self.store.delete_stored_before(self.cutoff()).await?;

        #[cfg(feature = "tracing")]
        debug!(removed, "Cleared expired cache entries");

        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let summary = self.store.summarize(self.cutoff()).await?;
        Ok(CacheStats {
            total: summary.total,
            valid: summary.total.saturating_sub(summary.expired),
            expired: summary.expired,
            size_bytes: summary.size_bytes,
            oldest: summary.oldest,
            newest: summary.newest,
            ttl_seconds: self.ttl().as_secs(),
        })
    }

    /// Most recently stored keys, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<RecentEntry>, CacheError> {
        Ok(self
            .store
            .recent(limit)
            .await?
            .into_iter()
            .map(|(phone_number, stored_at)| RecentEntry {
                phone_number,
                stored_at,
            })
            .collect())
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
