//! Change-driven cache invalidation.
//!
//! Tag-capable backends drop every entry of the namespace at once. Other
//! backends get their namespace version bumped, which orphans the old keys
//! until their TTL runs out.

use std::sync::Arc;

use async_trait::async_trait;

use folio_core::cache::{Cache, CacheKeyBuilder, Namespace, Result, INITIAL_VERSION};
use folio_core::events::{ChangeListener, RepositoryChanged};

use crate::config::CacheSettings;

/// What an invalidation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Caching is disabled, nothing to do.
    Skipped,
    /// Every entry tagged with the namespace was removed.
    Flushed,
    /// The namespace version moved to the contained value.
    VersionBumped(u64),
}

/// Invalidates namespaces in response to change events.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn Cache>,
    settings: CacheSettings,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn Cache>, settings: CacheSettings) -> Self {
        Self { cache, settings }
    }

    /// Invalidates every cached read of `namespace`.
    ///
    /// Safe to call concurrently for the same namespace: racing callers can
    /// only cause an extra invalidation, never a missed one.
    pub async fn invalidate(&self, namespace: &Namespace) -> Result<Invalidation> {
        if !self.settings.enabled {
            return Ok(Invalidation::Skipped);
        }

        let keys = CacheKeyBuilder::new(self.settings.prefix.clone(), namespace.clone());

        if self.settings.use_tags {
            if let Some(tagged) = self.cache.as_tagged() {
                tagged.flush_tags(&[keys.tag()]).await?;
                return Ok(Invalidation::Flushed);
            }
        }

        let version = self
            .cache
            .increment(&keys.version_key(), INITIAL_VERSION)
            .await?;
        Ok(Invalidation::VersionBumped(version))
    }
}

#[async_trait]
impl ChangeListener for CacheInvalidator {
    async fn handle(&self, event: &RepositoryChanged) {
        let namespace = event.namespace();
        match self.invalidate(namespace).await {
            Ok(Invalidation::Skipped) => {}
            Ok(Invalidation::Flushed) => {
                tracing::debug!(namespace = %namespace, "Flushed namespace tag");
            }
            Ok(Invalidation::VersionBumped(version)) => {
                tracing::debug!(namespace = %namespace, version, "Bumped namespace version");
            }
            Err(err) => {
                tracing::warn!(namespace = %namespace, error = %err, "Failed to invalidate namespace");
            }
        }
    }
}
