//! Redis cache backend implementation.
//!
//! Provides a distributed cache using Redis for multi-instance deployments.
//! Supports connection pooling, TTL, tag tracking sets and atomic counters.

mod cache;
mod error;

pub use cache::RedisCache;
