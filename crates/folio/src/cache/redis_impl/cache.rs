//! Redis cache implementation.
//!
//! Uses set-based key tracking for tag flushes without SCAN. Every tag owns
//! a Redis Set at `{tag}:_keys` listing the keys written under it.
//!
//! # Non-Atomicity Safety
//!
//! `set_tagged` and `flush_tags` are not atomic - they involve multiple
//! Redis commands. However, this is safe because:
//!
//! - **Orphaned members in a tracking set**: If a key expires or is deleted
//!   while still listed, flushing simply issues a DEL for a missing key.
//!   Each tracking set expires no earlier than its longest-lived member, so
//!   orphans never outlive the entries' TTL.
//!
//! - **Partial flush**: If a flush deletes some keys but fails before
//!   removing the tracking set, the next flush finishes the cleanup.
//!
//! The worst case is temporary inconsistency, not data corruption or lost writes.
//!
//! Counters use `SET NX` followed by `INCR`; each command is atomic on its
//! own, so concurrent increments are never lost.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use folio_core::cache::{encode_counter, Cache, Result, TaggedCache};

use super::error::map_redis_error;

/// Returns the Redis Set key tracking the members of `tag`.
fn tracking_key(tag: &str) -> String {
    format!("{}:_keys", tag)
}

/// Redis cache backend using connection manager for pooling.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn increment(&self, key: &str, initial: u64) -> Result<u64> {
        let mut conn = self.conn.clone();

        conn.set_nx::<_, _, ()>(key, encode_counter(initial))
            .await
            .map_err(map_redis_error)?;
        let next: u64 = conn.incr(key, 1u64).await.map_err(map_redis_error)?;

        Ok(next)
    }

    fn as_tagged(&self) -> Option<&dyn TaggedCache> {
        Some(self)
    }
}

#[async_trait]
impl TaggedCache for RedisCache {
    async fn set_tagged(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.set(key, value, ttl).await?;

        let mut conn = self.conn.clone();
        for tag in tags {
            let tracking = tracking_key(tag);

            // -2: no set yet, -1: set without expiry.
            let remaining: i64 = conn.ttl(&tracking).await.map_err(map_redis_error)?;
            conn.sadd::<_, _, ()>(&tracking, key)
                .await
                .map_err(map_redis_error)?;

            // The tracking set must outlive every member it lists.
            match ttl {
                None => conn
                    .persist::<_, ()>(&tracking)
                    .await
                    .map_err(map_redis_error)?,
                Some(duration) => {
                    let seconds = i64::try_from(duration.as_secs().max(1)).unwrap_or(i64::MAX);
                    if remaining != -1 && remaining < seconds {
                        conn.expire::<_, ()>(&tracking, seconds)
                            .await
                            .map_err(map_redis_error)?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<()> {
        let mut conn = self.conn.clone();

        // Note: The following operations are not atomic, but this is safe.
        // See module-level documentation for details on non-atomicity safety.
        for tag in tags {
            let tracking = tracking_key(tag);

            let tracked_keys: Vec<String> = conn
                .smembers(&tracking)
                .await
                .map_err(map_redis_error)?;

            if !tracked_keys.is_empty() {
                conn.del::<_, ()>(&tracked_keys)
                    .await
                    .map_err(map_redis_error)?;
            }

            conn.del::<_, ()>(&tracking)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Helper to get Redis URL from environment.
    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_cache() -> Option<RedisCache> {
        RedisCache::new(&redis_url()).await.ok()
    }

    /// Generate a unique test key to avoid conflicts.
    fn test_key(suffix: &str) -> String {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        format!(
            "test:redis_cache:{}:{}:{}",
            std::process::id(),
            n,
            suffix
        )
    }

    #[test]
    fn test_tracking_key_format() {
        assert_eq!(tracking_key("repo:Post"), "repo:Post:_keys");
    }

    #[tokio::test]
    async fn test_redis_set_and_get() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("set_get");
        let value = b"hello world";

        cache.set(&key, value, None).await.unwrap();

        let result = cache.get(&key).await.unwrap();
        assert_eq!(result, Some(value.to_vec()));

        // Clean up
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_get_nonexistent() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("nonexistent");
        let result = cache.get(&key).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_redis_increment_from_initial() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("version");

        assert_eq!(cache.increment(&key, 1).await.unwrap(), 2);
        assert_eq!(cache.increment(&key, 1).await.unwrap(), 3);
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"3".to_vec()));

        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_tracking_set_expires_with_entries() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let tag = test_key("expiring_tag");
        let key = test_key("expiring");

        cache
            .set_tagged(&[tag.clone()], &key, b"1", Some(Duration::from_secs(30)))
            .await
            .unwrap();
        cache
            .set_tagged(&[tag.clone()], &key, b"1", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let mut conn = cache.conn.clone();
        let remaining: i64 = conn.ttl(tracking_key(&tag)).await.unwrap();
        assert!(remaining > 5 && remaining <= 30, "remaining = {remaining}");

        cache.flush_tags(&[tag]).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_flush_tags() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let tag = test_key("tag");
        let other_tag = test_key("other_tag");
        let key1 = test_key("tagged1");
        let key2 = test_key("tagged2");
        let key3 = test_key("other");

        cache
            .set_tagged(&[tag.clone()], &key1, b"1", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        cache
            .set_tagged(&[tag.clone()], &key2, b"2", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        cache
            .set_tagged(&[other_tag.clone()], &key3, b"3", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        cache.flush_tags(&[tag.clone()]).await.unwrap();

        assert!(cache.get(&key1).await.unwrap().is_none());
        assert!(cache.get(&key2).await.unwrap().is_none());
        assert!(cache.get(&key3).await.unwrap().is_some());

        // Clean up
        cache.flush_tags(&[other_tag]).await.unwrap();
    }
}
