//! Storage backends and the decorators composed around them.
//!
//! - [`inmemory`]: In-memory repositories, always available
//! - `sqlite` (feature `sqlite`): SQLite repositories using `rusqlite` and `tokio-rusqlite`
//! - [`cached`]: Read-through caching decorators
//! - [`eventful`]: Change-event decorators for writes
//! - [`resolver`]: Composition of the decorator chain per entity type
//!
//! # Examples
//!
//! Build with SQLite:
//! ```bash
//! cargo build -p folio --features sqlite
//! ```

pub mod cached;
pub mod eventful;
pub mod inmemory;
pub mod resolver;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::{CachedPostRepository, CachedRepository};
pub use eventful::{EventfulPostRepository, EventfulRepository};
pub use inmemory::{InMemoryPostRepository, InMemoryRepository};
pub use resolver::{post_specialization, Contract, RepositoryResolver, Specialization};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
