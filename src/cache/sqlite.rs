//! SQLite backed cache store.

use super::error::CacheError;
use super::store::{CacheStore, StoreSummary, StoredEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "tracing")]
use tracing::info;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS lookup_results (
        phone_number TEXT PRIMARY KEY,
        result BLOB NOT NULL,
        timestamp REAL NOT NULL
    )
";

const TIMESTAMP_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS idx_lookup_results_timestamp
    ON lookup_results (timestamp)
";

/// Cache rows in the `lookup_results` table. Timestamps are stored as
/// fractional unix seconds.
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

fn to_unix(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

fn from_unix(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64).unwrap_or_default()
}

impl SqliteCacheStore {
    /// Open (and create if missing) a cache database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Open(e.to_string()))?;

        #[cfg(feature = "tracing")]
        info!(path = %path.as_ref().display(), "Opened lookup cache database");

        Self::from_pool(pool).await
    }

    /// A private in-memory database, gone when the store is dropped.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CacheError::Open(e.to_string()))?;

        // Every in-memory connection is its own database, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Open(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        sqlx::query(TIMESTAMP_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let row: Option<(String, Vec<u8>, f64)> = sqlx::query_as(
            r"
            SELECT phone_number, result, timestamp
            FROM lookup_results
            WHERE phone_number = ?
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(key, payload, ts)| StoredEntry {
            key,
            payload,
            stored_at: from_unix(ts),
        }))
    }

    async fn put(&self, entry: StoredEntry) -> Result<(), CacheError> {
        sqlx::query(
            r"
            INSERT INTO lookup_results (phone_number, result, timestamp)
            VALUES (?, ?, ?)
            ON CONFLICT(phone_number) DO UPDATE SET
                result = excluded.result,
                timestamp = excluded.timestamp
            ",
        )
        .bind(&entry.key)
        .bind(&entry.payload)
        .bind(to_unix(entry.stored_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let result = sqlx::query("DELETE FROM lookup_results WHERE phone_number = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan(&self) -> Result<Vec<StoredEntry>, CacheError> {
        let rows: Vec<(String, Vec<u8>, f64)> =
            sqlx::query_as("SELECT phone_number, result, timestamp FROM lookup_results")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(key, payload, ts)| StoredEntry {
                key,
                payload,
                stored_at: from_unix(ts),
            })
            .collect())
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM lookup_results")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_stored_before(&self, cutoff: DateTime<Utc>) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM lookup_results WHERE timestamp < ?")
            .bind(to_unix(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn summarize(&self, cutoff: DateTime<Utc>) -> Result<StoreSummary, CacheError> {
        let (total, expired, size_bytes, oldest, newest): (i64, i64, i64, Option<f64>, Option<f64>) =
            sqlx::query_as(
                r"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN timestamp < ? THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(LENGTH(result)), 0),
                    MIN(timestamp),
                    MAX(timestamp)
                FROM lookup_results
                ",
            )
            .bind(to_unix(cutoff))
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreSummary {
            total: total.max(0) as u64,
            expired: expired.max(0) as u64,
            size_bytes: size_bytes.max(0) as u64,
            oldest: oldest.map(from_unix),
            newest: newest.map(from_unix),
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<(String, DateTime<Utc>)>, CacheError> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            r"
            SELECT phone_number, timestamp
            FROM lookup_results
            ORDER BY timestamp DESC
            LIMIT ?
            ",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(k, ts)| (k, from_unix(ts))).collect())
    }
}
