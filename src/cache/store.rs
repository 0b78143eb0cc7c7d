//! Storage backends for the result cache.

use super::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// One stored cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// Normalized phone number.
    pub key: String,
    /// Serialized lookup result.
    pub payload: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

/// Aggregate view over the whole store, split at an expiry cutoff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSummary {
    pub total: u64,
    /// Entries stored strictly before the cutoff.
    pub expired: u64,
    pub size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Key/value storage used by [`ResultCache`](super::ResultCache).
///
/// Stores know nothing about TTLs or lookup results. They keep byte payloads
/// with a timestamp and answer scan and delete requests. The provided
/// methods work on top of [`scan`](Self::scan); backends with a query
/// language should override them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError>;

    /// Insert or overwrite the entry for `entry.key`.
    async fn put(&self, entry: StoredEntry) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Every stored entry, in no particular order.
    async fn scan(&self) -> Result<Vec<StoredEntry>, CacheError>;

    /// Remove everything, returning the number of removed entries.
    async fn clear(&self) -> Result<u64, CacheError>;

    /// Remove entries stored strictly before `cutoff`.
    async fn delete_stored_before(&self, cutoff: DateTime<Utc>) -> Result<u64, CacheError> {
        let mut removed = 0;
        for entry in self.scan().await? {
            if entry.stored_at < cutoff && self.delete(&entry.key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn summarize(&self, cutoff: DateTime<Utc>) -> Result<StoreSummary, CacheError> {
        let entries = self.scan().await?;
        Ok(StoreSummary {
            total: entries.len() as u64,
            expired: entries.iter().filter(|e| e.stored_at < cutoff).count() as u64,
            size_bytes: entries.iter().map(|e| e.payload.len() as u64).sum(),
            oldest: entries.iter().map(|e| e.stored_at).min(),
            newest: entries.iter().map(|e| e.stored_at).max(),
        })
    }

    /// Up to `limit` keys, most recently stored first.
    async fn recent(&self, limit: usize) -> Result<Vec<(String, DateTime<Utc>)>, CacheError> {
        let mut entries: Vec<_> = self
            .scan()
            .await?
            .into_iter()
            .map(|e| (e.key, e.stored_at))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Process-local store, mostly useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredEntry>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredEntry>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        Ok(self.read().get(key).cloned())
    }

    async fn put(&self, entry: StoredEntry) -> Result<(), CacheError> {
        self.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.write().remove(key).is_some())
    }

    async fn scan(&self) -> Result<Vec<StoredEntry>, CacheError> {
        Ok(self.read().values().cloned().collect())
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let mut entries = self.write();
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}
