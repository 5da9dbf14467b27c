//! Cache backends and the caching layer built on them.
//!
//! - [`memory`]: In-memory cache using tokio synchronization primitives
//! - `redis_impl` (feature `redis`): Redis cache using the redis crate
//! - [`versioned`]: Read-through cache keyed by namespace version
//! - [`invalidator`]: Tag flush or version bump on change events

pub mod invalidator;
pub mod memory;
pub mod versioned;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use invalidator::{CacheInvalidator, Invalidation};
pub use memory::MemoryCache;
pub use versioned::{CacheLayer, VersionedCache};

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
