//! In-memory cache implementation with LRU eviction.
//!
//! Provides a thread-safe in-memory cache with TTL support using
//! tokio synchronization primitives and LRU eviction policy.
//!
//! This implementation mirrors the Redis cache behavior for consistency:
//! - Keys written with tags are tracked per tag for grouped deletion
//! - Flushing a tag deletes every tracked key and the tracking set
//! - Deleting a key removes it from tracking
//! - Keys dropped by LRU eviction or TTL expiry leave tracking too, so the
//!   tag index never holds more keys than the LRU

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use folio_core::cache::{decode_counter, encode_counter, Cache, Result, TaggedCache};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Creates a new cache entry with optional TTL.
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    /// Returns true if this entry has expired.
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<LruCache>>` for concurrent access.
/// Supports TTL with lazy expiration (entries are cleaned up on access).
/// Uses LRU eviction to limit memory usage when max_entries is reached.
///
/// Values stored with [`Cache::forever`] and counters live outside the LRU,
/// so eviction can never roll a namespace back to an older version.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    /// Main key-value store with LRU eviction.
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Values that never expire and are never evicted.
    persistent: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Tracks keys by tag for grouped deletion.
    /// Maps tag -> Set of cache keys.
    tracking: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    /// Whether this cache advertises tag support.
    tagging: bool,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction and tag support.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of entries before LRU eviction kicks in.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            persistent: Arc::new(RwLock::new(HashMap::new())),
            tracking: Arc::new(RwLock::new(HashMap::new())),
            tagging: true,
        }
    }

    /// Turns off tag support, modelling a backend without grouped deletion.
    pub fn without_tags(mut self) -> Self {
        self.tagging = false;
        self
    }

    /// Returns the number of live entries, counters included.
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        let live = store.iter().filter(|(_, entry)| !entry.is_expired()).count();
        live + self.persistent.read().await.len()
    }

    /// Returns true if the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes `key` from every tag it is tracked under.
    async fn untrack(&self, key: &str) {
        let mut tracking = self.tracking.write().await;
        tracking.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.persistent.read().await.get(key) {
            return Ok(Some(value.clone()));
        }

        let expired = {
            let mut store = self.store.write().await;
            match store.get(key) {
                Some(entry) if entry.is_expired() => {
                    // Lazy cleanup: the expired entry is dropped on access.
                    store.pop(key);
                    true
                }
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        };

        if expired {
            self.untrack(key).await;
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.persistent.write().await.remove(key);

        let displaced = {
            let mut store = self.store.write().await;
            store.push(key.to_string(), CacheEntry::new(value.to_vec(), ttl))
        };

        // `push` also returns the old entry of a replaced key; only an
        // evicted key leaves tracking.
        if let Some((evicted, _)) = displaced {
            if evicted != key {
                self.untrack(&evicted).await;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.untrack(key).await;
        self.persistent.write().await.remove(key);
        self.store.write().await.pop(key);
        Ok(())
    }

    async fn forever(&self, key: &str, value: &[u8]) -> Result<()> {
        self.store.write().await.pop(key);
        self.persistent
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn increment(&self, key: &str, initial: u64) -> Result<u64> {
        // The write lock is held across read and write, making this atomic.
        let mut persistent = self.persistent.write().await;
        let current = match persistent.get(key) {
            Some(bytes) => decode_counter(bytes)?,
            None => initial,
        };
        let next = current.saturating_add(1);
        persistent.insert(key.to_string(), encode_counter(next));
        Ok(next)
    }

    fn as_tagged(&self) -> Option<&dyn TaggedCache> {
        if self.tagging {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl TaggedCache for MemoryCache {
    async fn set_tagged(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        // Tracked before insertion, so an eviction racing this write
        // always finds the key to untrack.
        {
            let mut tracking = self.tracking.write().await;
            for tag in tags {
                tracking
                    .entry(tag.clone())
                    .or_default()
                    .insert(key.to_string());
            }
        }

        self.set(key, value, ttl).await
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<()> {
        let tracked_keys: HashSet<String> = {
            let mut tracking = self.tracking.write().await;
            tags.iter()
                .filter_map(|tag| tracking.remove(tag))
                .flatten()
                .collect()
        };

        if !tracked_keys.is_empty() {
            let mut store = self.store.write().await;
            for key in &tracked_keys {
                store.pop(key);
            }
        }

        Ok(())
    }
}
