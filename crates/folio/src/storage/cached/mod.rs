//! Cached repository decorators.
//!
//! This module provides decorator implementations that wrap repository traits
//! with read-through caching:
//!
//! - **Reads**: Resolve the namespace version, check the cache, on miss fetch
//!   from the repository and populate the cache
//! - **Writes**: Pass straight through, never cached
//!
//! Invalidation is not done here; see [`crate::storage::eventful`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let layer = CacheLayer::new(Arc::new(MemoryCache::new(10_000)), CacheSettings::default());
//! let repo = Arc::new(InMemoryRepository::<Tag>::new());
//!
//! let cached = CachedRepository::new(repo, layer.for_namespace(Namespace::of::<Tag>()));
//! ```

mod post;
mod repository;

pub use post::CachedPostRepository;
pub use repository::CachedRepository;
