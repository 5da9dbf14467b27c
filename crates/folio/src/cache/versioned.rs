//! Versioned read-through caching.
//!
//! Every cached read lives under `{prefix}:{namespace}:{method}:{args}:v{version}`.
//! The version is read fresh on every call, so a bump made by the
//! invalidator is visible to the very next read.
//!
//! Cache failures never reach the caller: a backend error, an undecodable
//! value or a disabled cache all degrade to calling the producer directly.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use folio_core::cache::{
    decode_counter, deserialize_value, serialize_value, Cache, CacheKeyBuilder, KeyPart,
    Namespace, Result as CacheResult, INITIAL_VERSION,
};
use folio_core::storage::Result;

use crate::config::CacheSettings;

use super::invalidator::CacheInvalidator;

/// One cache backend plus the settings every decorator shares.
///
/// Built once at startup. Clones share the backend, which keeps every
/// namespace's version counter in a single place.
#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn Cache>,
    settings: CacheSettings,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn Cache>, settings: CacheSettings) -> Self {
        Self { cache, settings }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Returns a read-through cache scoped to `namespace`.
    pub fn for_namespace(&self, namespace: Namespace) -> VersionedCache {
        VersionedCache {
            cache: Arc::clone(&self.cache),
            settings: self.settings.clone(),
            keys: CacheKeyBuilder::new(self.settings.prefix.clone(), namespace),
        }
    }

    /// Returns an invalidator bound to the same backend and settings.
    pub fn invalidator(&self) -> CacheInvalidator {
        CacheInvalidator::new(Arc::clone(&self.cache), self.settings.clone())
    }
}

/// Read-through cache for a single namespace.
#[derive(Clone)]
pub struct VersionedCache {
    cache: Arc<dyn Cache>,
    settings: CacheSettings,
    keys: CacheKeyBuilder,
}

impl VersionedCache {
    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn namespace(&self) -> &Namespace {
        self.keys.namespace()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// True when writes are tagged with the namespace tag.
    pub fn uses_tags(&self) -> bool {
        self.settings.use_tags && self.cache.as_tagged().is_some()
    }

    /// Reads the namespace version, defaulting to [`INITIAL_VERSION`].
    pub async fn current_version(&self) -> CacheResult<u64> {
        match self.cache.get(&self.keys.version_key()).await? {
            Some(bytes) => Ok(decode_counter(&bytes)?),
            None => Ok(INITIAL_VERSION),
        }
    }

    /// Builds the key a read of `method` with `args` would use right now.
    pub async fn key_for(&self, method: &str, args: &[KeyPart]) -> CacheResult<String> {
        let version = self.current_version().await?;
        Ok(self.keys.versioned_key(method, args, version))
    }

    /// Returns the cached result of `method(args)`, calling `producer` on a miss.
    ///
    /// Producer errors propagate unchanged and are never cached.
    pub async fn remember<T, F, Fut>(&self, method: &str, args: &[KeyPart], producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        if !self.settings.enabled {
            return producer().await;
        }

        let namespace = self.namespace().as_str();

        let key = match self.key_for(method, args).await {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(namespace, method, error = %err, "Cache version unavailable, bypassing cache");
                return producer().await;
            }
        };

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match deserialize_value::<T>(&bytes) {
                Ok(value) => {
                    tracing::trace!(namespace, key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(namespace, key = %key, error = %err, "Cached value deserialization failed");
                }
            },
            Ok(None) => {
                tracing::trace!(namespace, key = %key, "Cache miss");
            }
            Err(err) => {
                tracing::warn!(namespace, key = %key, error = %err, "Cache read failed, bypassing cache");
                return producer().await;
            }
        }

        let value = producer().await?;
        match serialize_value(&value) {
            Ok(bytes) => self.store(&key, &bytes).await,
            Err(err) => {
                tracing::warn!(namespace, key = %key, error = %err, "Failed to serialize value for cache");
            }
        }
        Ok(value)
    }

    async fn store(&self, key: &str, bytes: &[u8]) {
        let ttl = Some(self.settings.ttl);
        let result = match self.cache.as_tagged() {
            Some(tagged) if self.settings.use_tags => {
                tagged
                    .set_tagged(&[self.keys.tag()], key, bytes, ttl)
                    .await
            }
            _ => self.cache.set(key, bytes, ttl).await,
        };

        if let Err(err) = result {
            tracing::warn!(key, error = %err, "Failed to cache value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use folio_core::cache::{encode_counter, CacheError, TaggedCache};
    use folio_core::storage::RepositoryError;

    use crate::cache::MemoryCache;

    /// Cache whose every operation fails.
    struct UnreachableCache;

    #[async_trait]
    impl Cache for UnreachableCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::ConnectionFailed("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::ConnectionFailed("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::ConnectionFailed("connection refused".to_string()))
        }
    }

    fn layer(cache: Arc<dyn Cache>, settings: CacheSettings) -> CacheLayer {
        CacheLayer::new(cache, settings)
    }

    fn posts(layer: &CacheLayer) -> VersionedCache {
        layer.for_namespace(Namespace::new("Post"))
    }

    async fn counted(calls: &AtomicUsize, value: u64) -> Result<u64> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_remember_miss_then_hit() {
        let cache = Arc::new(MemoryCache::new(100));
        let versioned = posts(&layer(cache.clone(), CacheSettings::default()));
        let calls = AtomicUsize::new(0);

        let first = versioned
            .remember("find", &[KeyPart::from(1u64)], || counted(&calls, 42))
            .await
            .unwrap();
        let second = versioned
            .remember("find", &[KeyPart::from(1u64)], || counted(&calls, 99))
            .await
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.get("repo:Post:find:1:v1").await.unwrap(),
            Some(b"42".to_vec())
        );
    }

    #[tokio::test]
    async fn test_remember_distinct_args_are_distinct_entries() {
        let cache = Arc::new(MemoryCache::new(100));
        let versioned = posts(&layer(cache, CacheSettings::default()));
        let calls = AtomicUsize::new(0);

        versioned
            .remember("paginate", &[15u64.into(), 1u64.into()], || counted(&calls, 1))
            .await
            .unwrap();
        let page_two = versioned
            .remember("paginate", &[15u64.into(), 2u64.into()], || counted(&calls, 2))
            .await
            .unwrap();

        assert_eq!(page_two, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remember_disabled_always_calls_producer() {
        let cache = Arc::new(MemoryCache::new(100));
        let settings = CacheSettings::default().with_enabled(false);
        let versioned = posts(&layer(cache.clone(), settings));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            versioned
                .remember("find", &[1u64.into()], || counted(&calls, 7))
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remember_unreachable_backend_degrades_to_producer() {
        let versioned = posts(&layer(Arc::new(UnreachableCache), CacheSettings::default()));
        let calls = AtomicUsize::new(0);

        let first = versioned
            .remember("find", &[1u64.into()], || counted(&calls, 5))
            .await
            .unwrap();
        let second = versioned
            .remember("find", &[1u64.into()], || counted(&calls, 5))
            .await
            .unwrap();

        assert_eq!((first, second), (5, 5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remember_producer_error_is_not_cached() {
        let cache = Arc::new(MemoryCache::new(100));
        let versioned = posts(&layer(cache.clone(), CacheSettings::default()));

        let result: Result<u64> = versioned
            .remember("findOrFail", &[9u64.into()], || async {
                Err(RepositoryError::not_found("Post", 9))
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remember_corrupt_entry_treated_as_miss() {
        let cache = Arc::new(MemoryCache::new(100));
        cache
            .set("repo:Post:find:1:v1", b"not json", None)
            .await
            .unwrap();
        let versioned = posts(&layer(cache, CacheSettings::default()));
        let calls = AtomicUsize::new(0);

        let value = versioned
            .remember("find", &[1u64.into()], || counted(&calls, 3))
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_read_per_request() {
        let cache = Arc::new(MemoryCache::new(100).without_tags());
        let versioned = posts(&layer(cache.clone(), CacheSettings::default()));

        assert_eq!(versioned.current_version().await.unwrap(), INITIAL_VERSION);

        cache
            .forever("repo:Post:v", &encode_counter(4))
            .await
            .unwrap();

        assert_eq!(versioned.current_version().await.unwrap(), 4);
        assert_eq!(
            versioned.key_for("find", &[1u64.into()]).await.unwrap(),
            "repo:Post:find:1:v4"
        );
    }

    #[tokio::test]
    async fn test_tagged_backend_tracks_namespace_tag() {
        let cache = Arc::new(MemoryCache::new(100));
        let versioned = posts(&layer(cache.clone(), CacheSettings::default()));
        assert!(versioned.uses_tags());

        versioned
            .remember("find", &[1u64.into()], || async { Ok(1u64) })
            .await
            .unwrap();
        cache.flush_tags(&["repo:Post".to_string()]).await.unwrap();

        assert!(cache.get("repo:Post:find:1:v1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tags_disabled_uses_plain_keys() {
        let cache = Arc::new(MemoryCache::new(100));
        let settings = CacheSettings::default().with_tags(false);
        let versioned = posts(&layer(cache.clone(), settings));
        assert!(!versioned.uses_tags());

        versioned
            .remember("find", &[1u64.into()], || async { Ok(1u64) })
            .await
            .unwrap();
        cache.flush_tags(&["repo:Post".to_string()]).await.unwrap();

        assert!(cache.get("repo:Post:find:1:v1").await.unwrap().is_some());
    }
}
