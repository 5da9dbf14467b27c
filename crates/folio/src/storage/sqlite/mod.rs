//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the repository traits
//! using `rusqlite` for synchronous operations and `tokio-rusqlite` for async wrapping.
//!
//! Every entity type shares one `records` table: rows are JSON documents keyed
//! by `(entity, id)`, and a non-null `deleted_at` marks a soft-deleted row.

mod codec;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
