//! In-memory cache backend implementation.
//!
//! Provides a thread-safe in-memory cache with TTL support, tag tracking and
//! atomic counters for single-instance deployments and tests.

mod cache;

pub use cache::MemoryCache;
