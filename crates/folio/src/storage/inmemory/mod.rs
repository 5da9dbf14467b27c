//! In-memory storage backend.
//!
//! This module provides an in-memory implementation of the repository traits
//! that keeps every entity of one type in a `BTreeMap` wrapped in
//! `Arc<RwLock<_>>`. This is useful for testing, for the demo binary and for
//! development scenarios where persistence is not required.
//!
//! # Example
//!
//! ```rust
//! use folio::storage::inmemory::InMemoryRepository;
//! use folio_core::content::Tag;
//!
//! let tags = InMemoryRepository::<Tag>::new();
//! let posts = folio::storage::inmemory::InMemoryPostRepository::soft_deleting();
//! ```

mod repository;

pub use repository::{InMemoryPostRepository, InMemoryRepository};
