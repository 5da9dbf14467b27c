//! Eventful post repository decorator.

use std::sync::Arc;

use async_trait::async_trait;

use folio_core::content::{Attributes, EntityId, Post};
use folio_core::storage::{Capability, Columns, Page, PostRepository, Repository, Result, SoftDeletes};

use crate::events::ChangeNotifier;

use super::EventfulRepository;

/// Change events for a [`PostRepository`].
///
/// `publish` and `duplicate` mutate posts and notify like any other write.
/// `published` is a read and passes through.
pub struct EventfulPostRepository<R: ?Sized> {
    base: EventfulRepository<R>,
}

impl<R> EventfulPostRepository<R>
where
    R: PostRepository + ?Sized,
{
    pub fn decorate(inner: Arc<R>, notifier: ChangeNotifier, capability: Capability) -> Result<Self> {
        Ok(Self {
            base: EventfulRepository::decorate(inner, notifier, capability)?,
        })
    }
}

#[async_trait]
impl<R> Repository for EventfulPostRepository<R>
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
impl<R> PostRepository for EventfulPostRepository<R>
where
    R: PostRepository + ?Sized,
{
    async fn publish(&self, id: EntityId) -> Result<Post> {
        self.base
            .emit_after("publish", self.base.inner().publish(id))
            .await
    }

    async fn duplicate(&self, id: EntityId) -> Result<Post> {
        self.base
            .emit_after("duplicate", self.base.inner().duplicate(id))
            .await
    }

    async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>> {
        self.base.inner().published(per_page, page).await
    }
}
