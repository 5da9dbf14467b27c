//! Functional core for folio.
//!
//! Pure types, contracts and functions shared by every backend: the CMS
//! entities, the repository contract, cache key construction and the
//! change event. Nothing in this crate performs I/O.

pub mod cache;
pub mod content;
pub mod events;
pub mod storage;
