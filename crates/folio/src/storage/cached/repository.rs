//! Generic cached repository decorator.

use std::sync::Arc;

use async_trait::async_trait;

use folio_core::content::{Attributes, EntityId};
use folio_core::storage::{
    Capability, Columns, Page, Repository, RepositoryError, Result, SoftDeletes,
};

use crate::cache::VersionedCache;

/// Read-through caching over any [`Repository`].
///
/// Reads go through [`VersionedCache::remember`] under the method names
/// `find`, `findOrFail`, `getByIds` and `paginate`. Writes and soft-delete
/// operations are forwarded untouched.
///
/// # Type Parameters
///
/// * `R` - The underlying repository, possibly a trait object
pub struct CachedRepository<R: ?Sized> {
    inner: Arc<R>,
    cache: VersionedCache,
    soft_deletes: bool,
}

impl<R> CachedRepository<R>
where
    R: Repository + ?Sized,
{
    /// Wraps `inner` with the base read/write contract only.
    pub fn new(inner: Arc<R>, cache: VersionedCache) -> Self {
        Self {
            inner,
            cache,
            soft_deletes: false,
        }
    }

    /// Wraps `inner` and exposes its soft-delete operations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if `inner` does not support
    /// soft deletes.
    pub fn with_soft_deletes(inner: Arc<R>, cache: VersionedCache) -> Result<Self> {
        if inner.soft_deletes().is_none() {
            return Err(RepositoryError::Configuration(format!(
                "cached {} repository requires soft-delete support",
                cache.namespace()
            )));
        }

        Ok(Self {
            inner,
            cache,
            soft_deletes: true,
        })
    }

    /// Wraps `inner` with the decorator matching `capability`.
    pub fn decorate(inner: Arc<R>, cache: VersionedCache, capability: Capability) -> Result<Self> {
        match capability {
            Capability::Plain => Ok(Self::new(inner, cache)),
            Capability::SoftDeletes => Self::with_soft_deletes(inner, cache),
        }
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    pub fn cache(&self) -> &VersionedCache {
        &self.cache
    }

    fn inner_soft_deletes(&self) -> Result<&dyn SoftDeletes> {
        self.inner.soft_deletes().ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "{} repository lost soft-delete support",
                self.cache.namespace()
            ))
        })
    }
}

#[async_trait]
impl<R> Repository for CachedRepository<R>
where
    R: Repository + ?Sized,
{
    type Entity = R::Entity;

    async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Self::Entity>> {
        self.cache
            .remember("find", &[id.into(), columns.into()], || {
                self.inner.find(id, columns)
            })
            .await
    }

    async fn find_or_fail(&self, id: EntityId, columns: &Columns) -> Result<Self::Entity> {
        self.cache
            .remember("findOrFail", &[id.into(), columns.into()], || {
                self.inner.find_or_fail(id, columns)
            })
            .await
    }

    async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Self::Entity>> {
        self.cache
            .remember("getByIds", &[ids.into(), columns.into()], || {
                self.inner.get_by_ids(ids, columns)
            })
            .await
    }

    async fn paginate(
        &self,
        per_page: u64,
        page: u64,
        columns: &Columns,
    ) -> Result<Page<Self::Entity>> {
        self.cache
            .remember(
                "paginate",
                &[per_page.into(), columns.into(), page.into()],
                || self.inner.paginate(per_page, page, columns),
            )
            .await
    }

    async fn create(&self, attributes: Attributes) -> Result<Self::Entity> {
        self.inner.create(attributes).await
    }

    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Self::Entity> {
        self.inner.update(id, attributes).await
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.inner.delete_many(ids).await
    }

    fn soft_deletes(&self) -> Option<&dyn SoftDeletes> {
        if self.soft_deletes {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl<R> SoftDeletes for CachedRepository<R>
where
    R: Repository + ?Sized,
{
    async fn restore(&self, id: EntityId) -> Result<bool> {
        self.inner_soft_deletes()?.restore(id).await
    }

    async fn restore_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.inner_soft_deletes()?.restore_many(ids).await
    }

    async fn force_delete(&self, id: EntityId) -> Result<bool> {
        self.inner_soft_deletes()?.force_delete(id).await
    }

    async fn force_delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.inner_soft_deletes()?.force_delete_many(ids).await
    }
}
