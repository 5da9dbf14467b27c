//! Cached post repository decorator.

use std::sync::Arc;

use async_trait::async_trait;

use folio_core::content::{Attributes, EntityId, Post};
use folio_core::storage::{Capability, Columns, Page, PostRepository, Repository, Result, SoftDeletes};

use crate::cache::VersionedCache;

use super::CachedRepository;

/// Read-through caching over a [`PostRepository`].
///
/// Base operations behave as in [`CachedRepository`]. `published` is cached
/// under the method name `published`; `publish` and `duplicate` are writes
/// and pass straight through.
pub struct CachedPostRepository<R: ?Sized> {
    base: CachedRepository<R>,
}

impl<R> CachedPostRepository<R>
where
    R: PostRepository + ?Sized,
{
    pub fn decorate(inner: Arc<R>, cache: VersionedCache, capability: Capability) -> Result<Self> {
        Ok(Self {
            base: CachedRepository::decorate(inner, cache, capability)?,
        })
    }
}

#[async_trait]
impl<R> Repository for CachedPostRepository<R>
where
    R: PostRepository + ?Sized,
{
    type Entity = Post;

    async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Post>> {
        self.base.find(id, columns).await
    }

    async fn find_or_fail(&self, id: EntityId, columns: &Columns) -> Result<Post> {
        self.base.find_or_fail(id, columns).await
    }

    async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Post>> {
        self.base.get_by_ids(ids, columns).await
    }

    async fn paginate(&self, per_page: u64, page: u64, columns: &Columns) -> Result<Page<Post>> {
        self.base.paginate(per_page, page, columns).await
    }

    async fn create(&self, attributes: Attributes) -> Result<Post> {
        self.base.create(attributes).await
    }

    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Post> {
        self.base.update(id, attributes).await
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        self.base.delete(id).await
    }

    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.base.delete_many(ids).await
    }

    fn soft_deletes(&self) -> Option<&dyn SoftDeletes> {
        self.base.soft_deletes()
    }
}

#[async_trait]
impl<R> PostRepository for CachedPostRepository<R>
where
    R: PostRepository + ?Sized,
{
    async fn publish(&self, id: EntityId) -> Result<Post> {
        self.base.inner().publish(id).await
    }

    async fn duplicate(&self, id: EntityId) -> Result<Post> {
        self.base.inner().duplicate(id).await
    }

    async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>> {
        self.base
            .cache()
            .remember("published", &[per_page.into(), page.into()], || {
                self.base.inner().published(per_page, page)
            })
            .await
    }
}
