//! Shared repositories, composed once at startup.
//!
//! Every entity binding is resolved here through one [`RepositoryResolver`],
//! so all of them share one cache backend, one invalidator and one change
//! notifier. Callers clone the resulting [`Repositories`] freely.

use std::sync::Arc;

use folio_core::cache::Cache;
use folio_core::content::{Category, Role, Tag};
use folio_core::storage::{Capability, PostRepository, Repository, Result};

use crate::cache::CacheLayer;
use crate::config::{CacheSettings, Config};
use crate::events::ChangeNotifier;
use crate::storage::inmemory::{InMemoryPostRepository, InMemoryRepository};
use crate::storage::{post_specialization, RepositoryResolver};

/// Undecorated repositories, one per entity type.
#[derive(Clone)]
pub struct Stores {
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn Repository<Entity = Category>>,
    pub tags: Arc<dyn Repository<Entity = Tag>>,
    pub roles: Arc<dyn Repository<Entity = Role>>,
}

impl Stores {
    /// In-memory stores. Posts are soft-deleting.
    pub fn in_memory() -> Self {
        Self {
            posts: Arc::new(InMemoryPostRepository::soft_deleting()),
            categories: Arc::new(InMemoryRepository::<Category>::new()),
            tags: Arc::new(InMemoryRepository::<Tag>::new()),
            roles: Arc::new(InMemoryRepository::<Role>::new()),
        }
    }
}

/// Decorated repositories handed to the rest of the application.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn Repository<Entity = Category>>,
    pub tags: Arc<dyn Repository<Entity = Tag>>,
    pub roles: Arc<dyn Repository<Entity = Role>>,
    layer: CacheLayer,
}

impl Repositories {
    /// Resolves every entity binding over `stores`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if a binding cannot be
    /// composed, e.g. a soft-deleting binding over a store without soft deletes.
    pub fn build(stores: Stores, cache: Arc<dyn Cache>, settings: CacheSettings) -> Result<Self> {
        let layer = CacheLayer::new(cache, settings);
        let notifier = ChangeNotifier::new(Arc::new(layer.invalidator()));

        let mut resolver = RepositoryResolver::new(layer.clone(), notifier);
        resolver.specialize(post_specialization());

        let repositories = Self {
            posts: resolver.resolve(stores.posts, Capability::SoftDeletes)?,
            categories: resolver.resolve(stores.categories, Capability::Plain)?,
            tags: resolver.resolve(stores.tags, Capability::Plain)?,
            roles: resolver.resolve(stores.roles, Capability::Plain)?,
            layer,
        };

        tracing::debug!(
            enabled = repositories.layer.settings().enabled,
            tags = repositories.layer.settings().use_tags,
            "Repositories resolved"
        );

        Ok(repositories)
    }

    /// The cache layer shared by every binding.
    pub fn layer(&self) -> &CacheLayer {
        &self.layer
    }
}

// ============================================================================
// Backend selection for the binary
// ============================================================================

/// Opens the configured cache backend.
#[cfg(not(feature = "redis"))]
pub async fn open_cache(config: &Config) -> anyhow::Result<Arc<dyn Cache>> {
    use crate::cache::MemoryCache;

    anyhow::ensure!(
        config.cache_max_entries > 0,
        "CACHE_MAX_ENTRIES must be greater than zero"
    );
    Ok(Arc::new(MemoryCache::new(config.cache_max_entries)))
}

/// Opens the configured cache backend.
#[cfg(feature = "redis")]
pub async fn open_cache(config: &Config) -> anyhow::Result<Arc<dyn Cache>> {
    use crate::cache::RedisCache;

    Ok(Arc::new(RedisCache::new(&config.redis_url).await?))
}

/// Opens the configured stores.
#[cfg(not(feature = "sqlite"))]
pub async fn open_stores(_config: &Config) -> anyhow::Result<Stores> {
    Ok(Stores::in_memory())
}

/// Opens the configured stores.
///
/// All entity types share one SQLite connection.
#[cfg(feature = "sqlite")]
pub async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    use crate::storage::SqliteRepository;
    use folio_core::content::Post;

    let posts = SqliteRepository::<Post>::new(&config.sqlite_path)
        .await?
        .soft_deleting();
    let conn = posts.connection().clone();

    Ok(Stores {
        categories: Arc::new(SqliteRepository::<Category>::with_connection(conn.clone()).await?),
        tags: Arc::new(SqliteRepository::<Tag>::with_connection(conn.clone()).await?),
        roles: Arc::new(SqliteRepository::<Role>::with_connection(conn).await?),
        posts: Arc::new(posts),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use folio_core::cache::{KeyPart, Namespace};
    use folio_core::content::{attributes, Attributes, EntityId, Post};
    use folio_core::storage::{Columns, Page, RepositoryError};
    use serde_json::json;

    use crate::cache::MemoryCache;

    /// Post store counting paginate calls and optionally failing writes.
    struct ProbePosts {
        inner: InMemoryPostRepository,
        paginates: AtomicUsize,
        fail_writes: bool,
    }

    impl ProbePosts {
        fn new(fail_writes: bool) -> Self {
            Self {
                inner: InMemoryPostRepository::soft_deleting(),
                paginates: AtomicUsize::new(0),
                fail_writes,
            }
        }

        fn paginates(&self) -> usize {
            self.paginates.load(Ordering::SeqCst)
        }

        fn check_write(&self) -> Result<()> {
            if self.fail_writes {
                Err(RepositoryError::QueryFailed("disk I/O error".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Repository for ProbePosts {
        type Entity = Post;

        async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Post>> {
            self.inner.find(id, columns).await
        }

        async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Post>> {
            self.inner.get_by_ids(ids, columns).await
        }

        async fn paginate(&self, per_page: u64, page: u64, columns: &Columns) -> Result<Page<Post>> {
            self.paginates.fetch_add(1, Ordering::SeqCst);
            self.inner.paginate(per_page, page, columns).await
        }

        async fn create(&self, attributes: Attributes) -> Result<Post> {
            self.check_write()?;
            self.inner.create(attributes).await
        }

        async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Post> {
            self.check_write()?;
            self.inner.update(id, attributes).await
        }

        async fn delete(&self, id: EntityId) -> Result<bool> {
            self.check_write()?;
            self.inner.delete(id).await
        }

        async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
            self.check_write()?;
            self.inner.delete_many(ids).await
        }

        fn soft_deletes(&self) -> Option<&dyn folio_core::storage::SoftDeletes> {
            self.inner.soft_deletes()
        }
    }

    #[async_trait]
    impl PostRepository for ProbePosts {
        async fn publish(&self, id: EntityId) -> Result<Post> {
            self.check_write()?;
            self.inner.publish(id).await
        }

        async fn duplicate(&self, id: EntityId) -> Result<Post> {
            self.check_write()?;
            self.inner.duplicate(id).await
        }

        async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>> {
            self.inner.published(per_page, page).await
        }
    }

    fn build(
        posts: Arc<ProbePosts>,
        cache: Arc<MemoryCache>,
        settings: CacheSettings,
    ) -> Repositories {
        let stores = Stores {
            posts,
            ..Stores::in_memory()
        };
        Repositories::build(stores, cache, settings).unwrap()
    }

    fn paginate_args() -> [KeyPart; 3] {
        [15u64.into(), (&Columns::all()).into(), 1u64.into()]
    }

    fn title(value: &str) -> Attributes {
        attributes(json!({ "title": value })).unwrap()
    }

    #[tokio::test]
    async fn test_paginate_create_paginate_with_version_bump() {
        let cache = Arc::new(MemoryCache::new(1000).without_tags());
        let posts = Arc::new(ProbePosts::new(false));
        let repos = build(posts.clone(), cache.clone(), CacheSettings::default());
        let versioned = repos.layer().for_namespace(Namespace::new("Post"));

        assert_eq!(
            versioned.key_for("paginate", &paginate_args()).await.unwrap(),
            "repo:Post:paginate:15:[*]:1:v1"
        );

        let first = repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
        assert_eq!(posts.paginates(), 1);
        assert!(cache
            .get("repo:Post:paginate:15:[*]:1:v1")
            .await
            .unwrap()
            .is_some());

        let second = repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(posts.paginates(), 1);

        repos.posts.create(title("X")).await.unwrap();
        assert_eq!(
            versioned.key_for("paginate", &paginate_args()).await.unwrap(),
            "repo:Post:paginate:15:[*]:1:v2"
        );

        let third = repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
        assert_eq!(posts.paginates(), 2);
        assert_eq!(third.items.len(), 1);
        assert_eq!(third.items[0].title, "X");

        // The v1 entry is orphaned, not deleted.
        assert!(cache
            .get("repo:Post:paginate:15:[*]:1:v1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_write_then_read_is_fresh_with_tags() {
        let cache = Arc::new(MemoryCache::new(1000));
        let posts = Arc::new(ProbePosts::new(false));
        let repos = build(posts.clone(), cache.clone(), CacheSettings::default());

        repos.posts.create(title("Before")).await.unwrap();
        let cached = repos.posts.find(1, &Columns::all()).await.unwrap().unwrap();
        assert_eq!(cached.title, "Before");

        repos.posts.update(1, title("After")).await.unwrap();

        let fresh = repos.posts.find(1, &Columns::all()).await.unwrap().unwrap();
        assert_eq!(fresh.title, "After");
        // Tag flush removes entries instead of bumping the version.
        assert!(cache.get("repo:Post:v").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_every_write_path_invalidates() {
        let cache = Arc::new(MemoryCache::new(1000).without_tags());
        let posts = Arc::new(ProbePosts::new(false));
        let repos = build(posts.clone(), cache, CacheSettings::default());
        repos.posts.create(title("A")).await.unwrap();

        let mut expected_reads = 0;
        let writes: Vec<&str> = vec![
            "update",
            "publish",
            "duplicate",
            "delete",
            "restore",
            "delete_many",
            "force_delete",
        ];
        for write in writes {
            repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
            expected_reads += 1;
            repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
            assert_eq!(posts.paginates(), expected_reads, "cached before {write}");

            match write {
                "update" => drop(repos.posts.update(1, title("B")).await.unwrap()),
                "publish" => drop(repos.posts.publish(1).await.unwrap()),
                "duplicate" => drop(repos.posts.duplicate(1).await.unwrap()),
                "delete" => assert!(repos.posts.delete(2).await.unwrap()),
                "restore" => {
                    let soft = repos.posts.soft_deletes().unwrap();
                    assert!(soft.restore(2).await.unwrap());
                }
                "delete_many" => assert_eq!(repos.posts.delete_many(&[2]).await.unwrap(), 1),
                "force_delete" => {
                    let soft = repos.posts.soft_deletes().unwrap();
                    assert!(soft.force_delete(2).await.unwrap());
                }
                _ => unreachable!(),
            }
        }

        repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
        assert_eq!(posts.paginates(), expected_reads + 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let cache = Arc::new(MemoryCache::new(1000).without_tags());
        let posts = Arc::new(ProbePosts::new(true));
        let repos = build(posts.clone(), cache.clone(), CacheSettings::default());

        repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();

        assert!(repos.posts.create(title("X")).await.is_err());
        assert!(repos.posts.update(1, title("X")).await.is_err());
        assert!(repos.posts.delete(1).await.is_err());
        assert!(repos.posts.publish(1).await.is_err());

        assert!(cache.get("repo:Post:v").await.unwrap().is_none());
        repos.posts.paginate(15, 1, &Columns::all()).await.unwrap();
        assert_eq!(posts.paginates(), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_matches_raw_repository() {
        let cache = Arc::new(MemoryCache::new(1000));
        let posts = Arc::new(ProbePosts::new(false));
        let settings = CacheSettings::default().with_enabled(false);
        let repos = build(posts.clone(), cache.clone(), settings);

        for name in ["a", "b", "c"] {
            repos.posts.create(title(name)).await.unwrap();
        }
        repos.posts.publish(2).await.unwrap();

        for _ in 0..3 {
            let decorated = repos.posts.paginate(2, 1, &Columns::all()).await.unwrap();
            let raw = posts.inner.paginate(2, 1, &Columns::all()).await.unwrap();
            assert_eq!(decorated, raw);
        }
        assert_eq!(
            repos.posts.published(10, 1).await.unwrap(),
            posts.inner.published(10, 1).await.unwrap()
        );

        assert_eq!(posts.paginates(), 3);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_namespaces_invalidate_independently() {
        let cache = Arc::new(MemoryCache::new(1000).without_tags());
        let repos = build(
            Arc::new(ProbePosts::new(false)),
            cache.clone(),
            CacheSettings::default(),
        );

        repos
            .tags
            .create(attributes(json!({ "name": "rust", "slug": "rust" })).unwrap())
            .await
            .unwrap();

        assert_eq!(cache.get("repo:Tag:v").await.unwrap(), Some(b"2".to_vec()));
        assert!(cache.get("repo:Post:v").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_binding_over_plain_store_fails() {
        let stores = Stores {
            posts: Arc::new(InMemoryPostRepository::new()),
            ..Stores::in_memory()
        };

        let result = Repositories::build(
            stores,
            Arc::new(MemoryCache::new(10)),
            CacheSettings::default(),
        );

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }
}
