//! Generic eventful repository decorator.

use std::sync::Arc;

use async_trait::async_trait;

use folio_core::cache::Namespace;
use folio_core::content::{Attributes, EntityId};
use folio_core::storage::{
    Capability, Columns, Page, Repository, RepositoryError, Result, SoftDeletes,
};

use crate::events::ChangeNotifier;

/// Emits a change event after every successful write of the wrapped repository.
///
/// Covers `create`, `update`, `delete`, `delete_many` and, when enabled, the
/// soft-delete operations. A failed write returns its error and emits nothing.
pub struct EventfulRepository<R: ?Sized> {
    inner: Arc<R>,
    notifier: ChangeNotifier,
    namespace: Namespace,
    soft_deletes: bool,
}

impl<R> EventfulRepository<R>
where
    R: Repository + ?Sized,
{
    /// Wraps `inner` with the base read/write contract only.
    pub fn new(inner: Arc<R>, notifier: ChangeNotifier) -> Self {
        Self {
            inner,
            notifier,
            namespace: Namespace::of::<R::Entity>(),
            soft_deletes: false,
        }
    }

    /// Wraps `inner` and exposes its soft-delete operations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if `inner` does not support
    /// soft deletes.
    pub fn with_soft_deletes(inner: Arc<R>, notifier: ChangeNotifier) -> Result<Self> {
        let mut repository = Self::new(inner, notifier);
        if repository.inner.soft_deletes().is_none() {
            return Err(RepositoryError::Configuration(format!(
                "eventful {} repository requires soft-delete support",
                repository.namespace
            )));
        }
        repository.soft_deletes = true;
        Ok(repository)
    }

    /// Wraps `inner` with the decorator matching `capability`.
    pub fn decorate(inner: Arc<R>, notifier: ChangeNotifier, capability: Capability) -> Result<Self> {
        match capability {
            Capability::Plain => Ok(Self::new(inner, notifier)),
            Capability::SoftDeletes => Self::with_soft_deletes(inner, notifier),
        }
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Runs `write` and notifies on success.
    pub async fn emit_after<T, Fut>(&self, operation: &'static str, write: Fut) -> Result<T>
    where
        T: Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
    {
        let value = self.notifier.after(&self.namespace, write).await?;
        tracing::debug!(namespace = %self.namespace, operation, "Repository write committed");
        Ok(value)
    }

    fn inner_soft_deletes(&self) -> Result<&dyn SoftDeletes> {
        self.inner.soft_deletes().ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "{} repository lost soft-delete support",
                self.namespace
            ))
        })
    }
}

#[async_trait]
impl<R> Repository for EventfulRepository<R>
where
    R: Repository + ?Sized,
{
    type Entity = R::Entity;

    async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Self::Entity>> {
        self.inner.find(id, columns).await
    }

    async fn find_or_fail(&self, id: EntityId, columns: &Columns) -> Result<Self::Entity> {
        self.inner.find_or_fail(id, columns).await
    }

    async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Self::Entity>> {
        self.inner.get_by_ids(ids, columns).await
    }

    async fn paginate(
        &self,
        per_page: u64,
        page: u64,
        columns: &Columns,
    ) -> Result<Page<Self::Entity>> {
        self.inner.paginate(per_page, page, columns).await
    }

    async fn create(&self, attributes: Attributes) -> Result<Self::Entity> {
        self.emit_after("create", self.inner.create(attributes))
            .await
    }

    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Self::Entity> {
        self.emit_after("update", self.inner.update(id, attributes))
            .await
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        self.emit_after("delete", self.inner.delete(id)).await
    }

    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.emit_after("delete_many", self.inner.delete_many(ids))
            .await
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
impl<R> SoftDeletes for EventfulRepository<R>
where
    R: Repository + ?Sized,
{
    async fn restore(&self, id: EntityId) -> Result<bool> {
        let inner = self.inner_soft_deletes()?;
        self.emit_after("restore", inner.restore(id)).await
    }

    async fn restore_many(&self, ids: &[EntityId]) -> Result<u64> {
        let inner = self.inner_soft_deletes()?;
        self.emit_after("restore_many", inner.restore_many(ids))
            .await
    }

    async fn force_delete(&self, id: EntityId) -> Result<bool> {
        let inner = self.inner_soft_deletes()?;
        self.emit_after("force_delete", inner.force_delete(id))
            .await
    }

    async fn force_delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        let inner = self.inner_soft_deletes()?;
        self.emit_after("force_delete_many", inner.force_delete_many(ids))
            .await
    }
}
