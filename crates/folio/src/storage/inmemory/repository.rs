//! In-memory repository implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use folio_core::content::{fill, Attributes, Entity, EntityId, Post};
use folio_core::storage::{
    Columns, Page, PostRepository, Repository, RepositoryError, Result, SoftDeletes,
};

/// Rows of one entity type.
#[derive(Debug)]
struct Table<E> {
    rows: BTreeMap<EntityId, E>,
    trashed: BTreeSet<EntityId>,
    next_id: EntityId,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            trashed: BTreeSet::new(),
            next_id: 1,
        }
    }
}

impl<E: Clone> Table<E> {
    fn live(&self, id: EntityId) -> Option<&E> {
        if self.trashed.contains(&id) {
            return None;
        }
        self.rows.get(&id)
    }

    fn live_rows(&self) -> impl Iterator<Item = &E> {
        self.rows
            .iter()
            .filter(|(id, _)| !self.trashed.contains(*id))
            .map(|(_, entity)| entity)
    }
}

/// In-memory storage backend for one entity type.
///
/// Uses a `BTreeMap` wrapped in `Arc<RwLock<_>>` for thread-safe access, so
/// pagination follows id order. Data is not persisted and will be lost when
/// the last clone of the repository is dropped.
///
/// Projections are not applied: reads always return whole entities.
#[derive(Debug, Clone)]
pub struct InMemoryRepository<E> {
    table: Arc<RwLock<Table<E>>>,
    soft_deletes: bool,
}

/// In-memory posts, with the post-specific operations.
pub type InMemoryPostRepository = InMemoryRepository<Post>;

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryRepository<E> {
    /// Creates a new empty repository that deletes rows for good.
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table::default())),
            soft_deletes: false,
        }
    }

    /// Creates a new empty repository whose deletes move rows to the trash.
    pub fn soft_deleting() -> Self {
        Self {
            soft_deletes: true,
            ..Self::new()
        }
    }

    /// Returns the number of rows, trashed ones included.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Returns true if the repository holds no rows at all.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns true if `id` is in the trash.
    pub async fn is_trashed(&self, id: EntityId) -> bool {
        self.table.read().await.trashed.contains(&id)
    }
}

#[async_trait]
impl<E: Entity> Repository for InMemoryRepository<E> {
    type Entity = E;

    async fn find(&self, id: EntityId, _columns: &Columns) -> Result<Option<E>> {
        let table = self.table.read().await;
        Ok(table.live(id).cloned())
    }

    async fn get_by_ids(&self, ids: &[EntityId], _columns: &Columns) -> Result<Vec<E>> {
        let table = self.table.read().await;
        Ok(ids.iter().filter_map(|id| table.live(*id).cloned()).collect())
    }

    async fn paginate(&self, per_page: u64, page: u64, _columns: &Columns) -> Result<Page<E>> {
        let table = self.table.read().await;
        let all = table.live_rows().cloned().collect();
        Ok(Page::from_items(all, per_page, page))
    }

    async fn create(&self, attributes: Attributes) -> Result<E> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        let entity: E = fill(None, id, &attributes)?;
        table.rows.insert(id, entity.clone());
        table.next_id += 1;
        Ok(entity)
    }

    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<E> {
        let mut table = self.table.write().await;
        let current = table
            .live(id)
            .ok_or_else(|| RepositoryError::not_found(E::NAME, id))?;
        let entity: E = fill(Some(current), id, &attributes)?;
        table.rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        let mut table = self.table.write().await;
        if table.live(id).is_none() {
            return Ok(false);
        }
        if self.soft_deletes {
            table.trashed.insert(id);
        } else {
            table.rows.remove(&id);
        }
        Ok(true)
    }

    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            if self.delete(*id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
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
impl<E: Entity> SoftDeletes for InMemoryRepository<E> {
    async fn restore(&self, id: EntityId) -> Result<bool> {
        let mut table = self.table.write().await;
        Ok(table.trashed.remove(&id))
    }

    async fn restore_many(&self, ids: &[EntityId]) -> Result<u64> {
        let mut table = self.table.write().await;
        Ok(ids.iter().filter(|id| table.trashed.remove(*id)).count() as u64)
    }

    async fn force_delete(&self, id: EntityId) -> Result<bool> {
        let mut table = self.table.write().await;
        table.trashed.remove(&id);
        Ok(table.rows.remove(&id).is_some())
    }

    async fn force_delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            if self.force_delete(*id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository<Post> {
    async fn publish(&self, id: EntityId) -> Result<Post> {
        let attributes = {
            let table = self.table.read().await;
            let post = table
                .live(id)
                .ok_or_else(|| RepositoryError::not_found(Post::NAME, id))?;
            post.publication_attributes(Utc::now())
        };
        self.update(id, attributes).await
    }

    async fn duplicate(&self, id: EntityId) -> Result<Post> {
        let attributes = {
            let table = self.table.read().await;
            let post = table
                .live(id)
                .ok_or_else(|| RepositoryError::not_found(Post::NAME, id))?;
            post.duplicate_attributes()
        };
        self.create(attributes).await
    }

    async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>> {
        let table = self.table.read().await;
        let mut posts: Vec<Post> = table
            .live_rows()
            .filter(|post| post.is_published())
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(Page::from_items(posts, per_page, page))
    }
}
