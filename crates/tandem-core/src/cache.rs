//! In-memory response cache with per-entry expiry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::DEFAULT_CACHE_TTL;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-wide key/value cache shared by every request.
///
/// Cloning is cheap and every clone sees the same entries. Entries are
/// evicted lazily: an expired entry is dropped the next time its key is
/// looked up. There is no per-key locking, so two concurrent misses on the
/// same key both compute and the last write wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    default_ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Cache whose entries live for one minute.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the live value for `key`, dropping it first if it has expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        // Another writer may have refreshed the key between the two locks.
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry {
            value: value.into(),
            expires_at,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Returns the cached value for `key` or runs `compute` and caches its
    /// result for `ttl`.
    ///
    /// A failed `compute` leaves the cache untouched and its error is
    /// returned as is. The lock is never held while `compute` runs.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F, ttl: Duration) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(key, "cache miss");
        let value = compute().await?;
        self.put(key, value.clone(), Some(ttl)).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
