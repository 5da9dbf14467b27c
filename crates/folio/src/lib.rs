//! Versioned read-through caching and change-driven invalidation for content
//! repositories.
//!
//! Repositories are wrapped twice: a caching decorator serves reads from a
//! [`cache::VersionedCache`], and an eventful decorator reports every
//! successful write to the [`cache::CacheInvalidator`]. Bindings are composed
//! once by [`storage::RepositoryResolver`] and shared through
//! [`state::Repositories`].

pub mod cache;
pub mod config;
pub mod demo;
pub mod events;
pub mod state;
pub mod storage;
