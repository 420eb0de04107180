//! SELECT result memoization.
//!
//! The builder's cached read path is the classic `remember` contract:
//! return the stored rows if present and not expired, otherwise run the
//! query, store the result for `minutes`, and return it. The store itself
//! is behind [`CacheManager`]; [`MemoryCache`] is the bundled in-process
//! implementation.

use crate::connection::Row;
use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Key → row-set store with per-entry TTL.
#[async_trait]
pub trait CacheManager: Send + Sync {
    /// Fetch the rows stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> QueryResult<Option<Vec<Row>>>;

    /// Store `rows` under `key` for `minutes`.
    async fn put(&self, key: &str, rows: Vec<Row>, minutes: u64) -> QueryResult<()>;
}

struct CacheEntry {
    rows: Vec<Row>,
    expires_at: SystemTime,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }
}

/// In-process cache with `SystemTime`-based expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheManager for MemoryCache {
    async fn get(&self, key: &str) -> QueryResult<Option<Vec<Row>>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| QueryError::Cache("poisoned cache lock".to_string()))?;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.rows.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, rows: Vec<Row>, minutes: u64) -> QueryResult<()> {
        let entry = CacheEntry {
            rows,
            expires_at: SystemTime::now() + Duration::from_secs(minutes * 60),
        };
        self.entries
            .lock()
            .map_err(|_| QueryError::Cache("poisoned cache lock".to_string()))?
            .insert(key.to_string(), entry);
        Ok(())
    }
}
