//! Persistent lookup result cache.
//!
//! [`ResultCache`] applies the TTL and (de)serializes results; the bytes
//! live in a [`CacheStore`], either [`SqliteCacheStore`] or the in-process
//! [`MemoryCacheStore`].

pub(crate) mod clock;
pub(crate) mod error;
pub(crate) mod sqlite;
pub(crate) mod store;
pub(crate) mod structure;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use sqlite::SqliteCacheStore;
pub use store::{CacheStore, MemoryCacheStore, StoreSummary, StoredEntry};
pub use structure::{CacheStats, DEFAULT_CACHE_TTL, RecentEntry, ResultCache};
