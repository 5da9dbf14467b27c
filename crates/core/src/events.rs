//! The repository change event.
//!
//! A write decorator emits [`RepositoryChanged`] after every successful
//! mutation. The event carries only the namespace that changed and is
//! handed to exactly one [`ChangeListener`], the cache invalidator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::Namespace;

/// Data under a namespace changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryChanged {
    namespace: Namespace,
}

impl RepositoryChanged {
    /// Creates the event for `namespace`.
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }

    /// Returns the namespace that changed.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// Receives change events.
#[async_trait]
pub trait ChangeListener: Send + Sync {
    /// Handles one change event. Must not fail the write that emitted it.
    async fn handle(&self, event: &RepositoryChanged);
}
