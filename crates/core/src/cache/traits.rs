use std::time::Duration;

use async_trait::async_trait;

use super::{decode_counter, encode_counter, Result};

/// Trait for basic cache operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Stores a value that never expires and is never evicted.
    async fn forever(&self, key: &str, value: &[u8]) -> Result<()> {
        self.set(key, value, None).await
    }

    /// Increments the counter at `key`, treating an absent counter as
    /// `initial`. Returns the new value.
    ///
    /// The default implementation reads then writes and is therefore not
    /// atomic: two racing callers may both observe the same value and store
    /// the same successor. Backends with a native increment override it.
    async fn increment(&self, key: &str, initial: u64) -> Result<u64> {
        let current = match self.get(key).await? {
            Some(bytes) => decode_counter(&bytes)?,
            None => initial,
        };
        let next = current.saturating_add(1);
        self.forever(key, &encode_counter(next)).await?;
        Ok(next)
    }

    /// Tag-scoped operations, when the backend supports them.
    ///
    /// This is a runtime capability probe; callers must not assume support.
    fn as_tagged(&self) -> Option<&dyn TaggedCache> {
        None
    }
}

/// Grouped invalidation: entries written with a tag can be evicted together.
#[async_trait]
pub trait TaggedCache: Send + Sync {
    /// Sets a value and associates it with every tag in `tags`.
    async fn set_tagged(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Deletes every entry associated with any tag in `tags`.
    async fn flush_tags(&self, tags: &[String]) -> Result<()>;
}
