//! Time-bounded caching for slow-changing lookup metadata.
//!
//! [`MetadataCache`] memoizes `(category, name) -> identifier` lookups,
//! the kind of rarely-changing reference data (type names, statuses,
//! roles) that would otherwise cost one round trip per use.
//! [`TimedMemo`] is the general-purpose sibling: a small TTL memoizer
//! over arbitrary keys and values, kept separate so the metadata policy
//! does not leak into a generic utility.

use crate::errors::CatalogResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe TTL cache for name-to-identifier metadata lookups.
///
/// Entries are replaced whole: a refresh writes a complete new entry
/// under the lock, so readers never observe a torn state. A cache-miss
/// stampede (several tasks missing the same key at once) resolves with
/// at most one redundant fetch per caller; the last write wins.
pub struct MetadataCache {
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
}

impl MetadataCache {
    /// Create a cache whose entries expire `ttl` after being written
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached identifier for `(category, name)`, fetching and
    /// storing it via `fetch_fn` on a miss or after expiry.
    ///
    /// `fetch_fn` is awaited without holding the internal lock.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        category: &str,
        name: &str,
        fetch_fn: F,
    ) -> CatalogResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<String>>,
    {
        let key = (category.to_string(), name.to_string());

        if let Some(entry) = self.entries.lock().get(&key) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.value.clone());
            }
        }

        let value = fetch_fn().await?;
        self.entries.lock().insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(value)
    }

    /// Look up `(category, name)` without fetching.
    pub fn peek(&self, category: &str, name: &str) -> Option<String> {
        let key = (category.to_string(), name.to_string());
        self.entries
            .lock()
            .get(&key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Remove every entry. The next lookup for any key refetches.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Eagerly re-fetch every currently-known key and replace its entry.
    ///
    /// Keys whose fetch fails keep their existing entry and are logged;
    /// the return value is the number of entries refreshed.
    pub async fn refresh_all<F, Fut>(&self, fetch_fn: F) -> usize
    where
        F: Fn(&str, &str) -> Fut,
        Fut: Future<Output = CatalogResult<String>>,
    {
        let keys: Vec<(String, String)> = self.entries.lock().keys().cloned().collect();
        let mut refreshed = 0;

        for (category, name) in keys {
            match fetch_fn(&category, &name).await {
                Ok(value) => {
                    self.entries.lock().insert(
                        (category, name),
                        CacheEntry {
                            value,
                            expires_at: Instant::now() + self.ttl,
                        },
                    );
                    refreshed += 1;
                }
                Err(e) => {
                    tracing::warn!(category, name, error = %e, "metadata refresh failed");
                }
            }
        }

        refreshed
    }
}

/// Generic TTL memoizer over arbitrary keys and cloneable values.
pub struct TimedMemo<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K, V> TimedMemo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a memoizer whose entries expire `ttl` after insertion
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the unexpired value for `key`, if present
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .get(key)
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(value, _)| value.clone())
    }

    /// Store `value` under `key`, restarting its TTL
    pub fn put(&self, key: K, value: V) {
        self.entries
            .lock()
            .insert(key, (value, Instant::now() + self.ttl));
    }

    /// Return the cached value or compute, store and return a fresh one
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch_fn: F) -> CatalogResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<V>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = fetch_fn().await?;
        self.put(key, value.clone());
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
