//! Change notification for repository writes.
//!
//! A [`ChangeNotifier`] owns the single listener every write event goes to.
//! Events are dispatched only after the wrapped write has succeeded, and the
//! listener is awaited before the write call returns.

use std::future::Future;
use std::sync::Arc;

use folio_core::cache::Namespace;
use folio_core::events::{ChangeListener, RepositoryChanged};
use folio_core::storage::Result;

/// Emits [`RepositoryChanged`] events to the global listener.
#[derive(Clone)]
pub struct ChangeNotifier {
    listener: Arc<dyn ChangeListener>,
}

impl ChangeNotifier {
    /// Creates a notifier delivering every event to `listener`.
    pub fn new(listener: Arc<dyn ChangeListener>) -> Self {
        Self { listener }
    }

    /// Dispatches a change event for `namespace`.
    pub async fn notify(&self, namespace: &Namespace) {
        let event = RepositoryChanged::new(namespace.clone());
        tracing::trace!(namespace = %namespace, "Repository changed");
        self.listener.handle(&event).await;
    }

    /// Runs `write`, then notifies for `namespace` if it succeeded.
    ///
    /// A failed write returns its error and emits nothing.
    pub async fn after<T, Fut>(&self, namespace: &Namespace, write: Fut) -> Result<T>
    where
        T: Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let value = write.await?;
        self.notify(namespace).await;
        Ok(value)
    }
}
