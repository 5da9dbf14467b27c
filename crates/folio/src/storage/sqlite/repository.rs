//! SQLite repository implementation.
//!
//! Implements the repository traits from `folio_core::storage` using SQLite.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use folio_core::content::{fill, Attributes, Entity, EntityId, Post};
use folio_core::storage::{
    Columns, Page, PostRepository, Repository, RepositoryError, Result, SoftDeletes,
};

use super::codec::{entity_id, entity_to_body, format_datetime, limit_offset, row_to_entity, sql_id};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based repository for one entity type.
///
/// Clones share the connection. Repositories for different entity types can
/// share one database through [`SqliteRepository::with_connection`].
pub struct SqliteRepository<E> {
    conn: Connection,
    soft_deletes: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SqliteRepository<E> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            soft_deletes: self.soft_deletes,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> SqliteRepository<E> {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::with_connection(conn).await
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::with_connection(conn).await
    }

    /// Creates a repository on an already open connection.
    pub async fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn).await?;

        Ok(Self {
            conn,
            soft_deletes: false,
            _entity: PhantomData,
        })
    }

    /// Makes deletes set `deleted_at` instead of removing rows.
    pub fn soft_deleting(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Returns the underlying connection, for sharing with other entity types.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    /// Executes a single-row statement and reports whether a row changed.
    async fn execute_for_id(&self, sql: &'static str, id: EntityId, stamp: Option<String>) -> Result<bool> {
        let key = sql_id(id)?;

        self.conn
            .call(move |conn| {
                let rows = match stamp {
                    Some(stamp) => conn.execute(sql, rusqlite::params![E::NAME, key, stamp]),
                    None => conn.execute(sql, rusqlite::params![E::NAME, key]),
                }
                .map_err(wrap_err)?;
                Ok(rows > 0)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, E::NAME, id.to_string()))
    }

    /// Executes a single-row statement for every id in one transaction.
    ///
    /// Every id is validated before the store is touched, and a failing
    /// statement rolls back the rows already changed.
    async fn execute_for_ids(
        &self,
        sql: &'static str,
        ids: &[EntityId],
        stamp: Option<String>,
    ) -> Result<u64> {
        let keys = ids.iter().map(|id| sql_id(*id)).collect::<Result<Vec<_>>>()?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut changed = 0u64;
                {
                    let mut stmt = tx.prepare(sql).map_err(wrap_err)?;
                    for key in keys {
                        let rows = match &stamp {
                            Some(stamp) => stmt.execute(rusqlite::params![E::NAME, key, stamp]),
                            None => stmt.execute(rusqlite::params![E::NAME, key]),
                        }
                        .map_err(wrap_err)?;
                        if rows > 0 {
                            changed += 1;
                        }
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(changed)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::NAME))
    }

    /// Loads a page of rows from a `(LIMIT, OFFSET)` query and its count query.
    async fn page(
        &self,
        select: &'static str,
        count: &'static str,
        per_page: u64,
        page: u64,
    ) -> Result<Page<E>> {
        let (limit, offset) = limit_offset(per_page, page);

        let (items, total) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(select).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params![E::NAME, limit, offset], row_to_entity::<E>)
                    .map_err(wrap_err)?;

                let mut items = Vec::new();
                for row_result in rows {
                    items.push(row_result.map_err(wrap_err)?);
                }

                let total: i64 = conn
                    .query_row(count, [E::NAME], |row| row.get(0))
                    .map_err(wrap_err)?;
                Ok((items, total))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::NAME))?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            per_page: per_page.max(1),
            current_page: page.max(1),
        })
    }
}

#[async_trait]
impl<E: Entity> Repository for SqliteRepository<E> {
    type Entity = E;

    async fn find(&self, id: EntityId, _columns: &Columns) -> Result<Option<E>> {
        let key = sql_id(id)?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_LIVE_BY_ID).map_err(wrap_err)?;
                match stmt.query_row(rusqlite::params![E::NAME, key], row_to_entity::<E>) {
                    Ok(entity) => Ok(Some(entity)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, E::NAME, id.to_string()))
    }

    async fn get_by_ids(&self, ids: &[EntityId], _columns: &Columns) -> Result<Vec<E>> {
        let keys = ids.iter().map(|id| sql_id(*id)).collect::<Result<Vec<_>>>()?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_LIVE_BY_ID).map_err(wrap_err)?;
                let mut entities = Vec::with_capacity(keys.len());
                for key in keys {
                    let found = stmt
                        .query_row(rusqlite::params![E::NAME, key], row_to_entity::<E>)
                        .optional()
                        .map_err(wrap_err)?;
                    entities.extend(found);
                }
                Ok(entities)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::NAME))
    }

    async fn paginate(&self, per_page: u64, page: u64, _columns: &Columns) -> Result<Page<E>> {
        self.page(schema::SELECT_LIVE_PAGE, schema::COUNT_LIVE, per_page, page)
            .await
    }

    async fn create(&self, attributes: Attributes) -> Result<E> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let next: i64 = tx
                    .query_row(schema::NEXT_ID, [E::NAME], |row| row.get(0))
                    .map_err(wrap_err)?;
                let id = entity_id(next).map_err(wrap_err)?;

                let created = fill::<E>(None, id, &attributes)
                    .map_err(RepositoryError::from)
                    .and_then(|entity| Ok((entity_to_body(&entity)?, entity)));
                let (body, entity) = match created {
                    Ok(pair) => pair,
                    Err(err) => return Ok(Err(err)),
                };

                tx.execute(schema::INSERT_RECORD, rusqlite::params![E::NAME, next, body])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(entity))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::NAME))?
    }

    async fn update(&self, id: EntityId, attributes: Attributes) -> Result<E> {
        let key = sql_id(id)?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let current = tx
                    .query_row(
                        schema::SELECT_LIVE_BY_ID,
                        rusqlite::params![E::NAME, key],
                        row_to_entity::<E>,
                    )
                    .optional()
                    .map_err(wrap_err)?;
                let Some(current) = current else {
                    return Ok(Err(RepositoryError::not_found(E::NAME, id)));
                };

                let updated = fill::<E>(Some(&current), id, &attributes)
                    .map_err(RepositoryError::from)
                    .and_then(|entity| Ok((entity_to_body(&entity)?, entity)));
                let (body, entity) = match updated {
                    Ok(pair) => pair,
                    Err(err) => return Ok(Err(err)),
                };

                tx.execute(schema::UPDATE_BODY, rusqlite::params![E::NAME, key, body])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(entity))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, E::NAME, id.to_string()))?
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        if self.soft_deletes {
            let stamp = format_datetime(&Utc::now());
            self.execute_for_id(schema::SOFT_DELETE, id, Some(stamp)).await
        } else {
            self.execute_for_id(schema::DELETE_LIVE, id, None).await
        }
    }

    async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        if self.soft_deletes {
            let stamp = format_datetime(&Utc::now());
            self.execute_for_ids(schema::SOFT_DELETE, ids, Some(stamp)).await
        } else {
            self.execute_for_ids(schema::DELETE_LIVE, ids, None).await
        }
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
impl<E: Entity> SoftDeletes for SqliteRepository<E> {
    async fn restore(&self, id: EntityId) -> Result<bool> {
        self.execute_for_id(schema::RESTORE, id, None).await
    }

    async fn restore_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.execute_for_ids(schema::RESTORE, ids, None).await
    }

    async fn force_delete(&self, id: EntityId) -> Result<bool> {
        self.execute_for_id(schema::FORCE_DELETE, id, None).await
    }

    async fn force_delete_many(&self, ids: &[EntityId]) -> Result<u64> {
        self.execute_for_ids(schema::FORCE_DELETE, ids, None).await
    }
}

#[async_trait]
impl PostRepository for SqliteRepository<Post> {
    async fn publish(&self, id: EntityId) -> Result<Post> {
        let post = self.find_or_fail(id, &Columns::all()).await?;
        self.update(id, post.publication_attributes(Utc::now()))
            .await
    }

    async fn duplicate(&self, id: EntityId) -> Result<Post> {
        let post = self.find_or_fail(id, &Columns::all()).await?;
        self.create(post.duplicate_attributes()).await
    }

    async fn published(&self, per_page: u64, page: u64) -> Result<Page<Post>> {
        self.page(
            schema::SELECT_PUBLISHED_PAGE,
            schema::COUNT_PUBLISHED,
            per_page,
            page,
        )
        .await
    }
}
