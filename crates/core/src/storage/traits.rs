use async_trait::async_trait;

use crate::content::{Attributes, Entity, EntityId, Post};

use super::{Columns, Page, RepositoryError, Result};

/// Data access for one entity type.
///
/// Implemented by the stores and, with the same signatures, by every
/// decorator wrapping them.
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: Entity;

    /// Gets an entity by its ID.
    async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Self::Entity>>;

    /// Gets an entity by its ID, failing with `NotFound` when absent.
    async fn find_or_fail(&self, id: EntityId, columns: &Columns) -> Result<Self::Entity> {
        self.find(id, columns)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Self::Entity::NAME, id))
    }

    /// Gets every existing entity among `ids`, in ID order.
    async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Self::Entity>>;

    /// Gets page `page` (1-based) of `per_page` entities.
    async fn paginate(
        &self,
        per_page: u64,
        page: u64,
        columns: &Columns,
    ) -> Result<Page<Self::Entity>>;

    /// Creates an entity from attributes.
    async fn create(&self, attributes: Attributes) -> Result<Self::Entity>;

    /// Applies attributes to an existing entity.
    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Self::Entity>;

    /// Deletes an entity. Returns false if nothing was deleted.
    async fn delete(&self, id: EntityId) -> Result<bool>;

    /// Deletes every entity among `ids`. Returns the number deleted.
    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64>;

    /// Soft-delete operations, when this repository supports them.
    fn soft_deletes(&self) -> Option<&dyn SoftDeletes> {
        None
    }
}

/// Restore and permanent deletion of soft-deleted entities.
#[async_trait]
pub trait SoftDeletes: Send + Sync {
    /// Restores a soft-deleted entity. Returns false if it was not trashed.
    async fn restore(&self, id: EntityId) -> Result<bool>;

    /// Restores every trashed entity among `ids`. Returns the number restored.
    async fn restore_many(&self, ids: &[EntityId]) -> Result<u64>;

    /// Permanently deletes an entity, trashed or not.
    async fn force_delete(&self, id: EntityId) -> Result<bool>;

    /// Permanently deletes every entity among `ids`. Returns the number deleted.
    async fn force_delete_many(&self, ids: &[EntityId]) -> Result<u64>;
}

/// Post-specific operations on top of the base contract.
#[async_trait]
pub trait PostRepository: Repository<Entity = Post> {
    /// Publishes a post now. Publishing a published post keeps its date.
    async fn publish(&self, id: EntityId) -> Result<Post>;

    /// Creates a draft copy of a post.
    async fn duplicate(&self, id: EntityId) -> Result<Post>;

    /// Gets page `page` of published posts, newest first.
    async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>>;
}
