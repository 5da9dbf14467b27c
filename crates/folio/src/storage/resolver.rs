//! Repository composition.
//!
//! The resolver turns a base repository into the full decorator chain:
//! `Eventful(Cached(base))`. Entity types can register a [`Specialization`]
//! carrying their own cache and event decorators. Unregistered entity types
//! get the generic decorators, parameterized by the requested [`Capability`].
//!
//! A specialization must provide both decorators. Registering only one of
//! them is a configuration error reported at resolution time.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use folio_core::cache::Namespace;
use folio_core::content::{Entity, Post};
use folio_core::storage::{Capability, PostRepository, Repository, RepositoryError, Result};

use crate::cache::CacheLayer;
use crate::events::ChangeNotifier;

use super::cached::{CachedPostRepository, CachedRepository};
use super::eventful::{EventfulPostRepository, EventfulRepository};

/// A repository trait object the resolver can decorate.
pub trait Contract: Send + Sync + 'static {
    type Entity: Entity;

    /// Probes the capability the repository actually implements.
    fn capability(&self) -> Capability;

    /// Builds the generic chain for this contract.
    fn decorate_generic(
        base: Arc<Self>,
        capability: Capability,
        layer: &CacheLayer,
        notifier: &ChangeNotifier,
    ) -> Result<Arc<Self>>;
}

impl<E: Entity> Contract for dyn Repository<Entity = E> {
    type Entity = E;

    fn capability(&self) -> Capability {
        Capability::of(self)
    }

    fn decorate_generic(
        base: Arc<Self>,
        capability: Capability,
        layer: &CacheLayer,
        notifier: &ChangeNotifier,
    ) -> Result<Arc<Self>> {
        let cache = layer.for_namespace(Namespace::of::<E>());
        let cached: Arc<Self> = Arc::new(CachedRepository::decorate(base, cache, capability)?);
        let eventful = EventfulRepository::decorate(cached, notifier.clone(), capability)?;
        Ok(Arc::new(eventful))
    }
}

impl Contract for dyn PostRepository {
    type Entity = Post;

    fn capability(&self) -> Capability {
        Capability::of(self)
    }

    fn decorate_generic(
        _base: Arc<Self>,
        _capability: Capability,
        _layer: &CacheLayer,
        _notifier: &ChangeNotifier,
    ) -> Result<Arc<Self>> {
        Err(RepositoryError::Configuration(
            "PostRepository needs a registered Post specialization".to_string(),
        ))
    }
}

type CacheDecorator<C> =
    Arc<dyn Fn(Arc<C>, &CacheLayer, Capability) -> Result<Arc<C>> + Send + Sync>;
type EventDecorator<C> =
    Arc<dyn Fn(Arc<C>, &ChangeNotifier, Capability) -> Result<Arc<C>> + Send + Sync>;

/// Entity-specific decorators for one contract.
pub struct Specialization<C: ?Sized> {
    cache: Option<CacheDecorator<C>>,
    events: Option<EventDecorator<C>>,
}

impl<C: Contract + ?Sized> Default for Specialization<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Contract + ?Sized> Specialization<C> {
    pub fn new() -> Self {
        Self {
            cache: None,
            events: None,
        }
    }

    /// Sets the innermost decorator, wrapping the base repository.
    pub fn cache<F>(mut self, decorator: F) -> Self
    where
        F: Fn(Arc<C>, &CacheLayer, Capability) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        self.cache = Some(Arc::new(decorator));
        self
    }

    /// Sets the outermost decorator, wrapping the cache decorator.
    pub fn events<F>(mut self, decorator: F) -> Self
    where
        F: Fn(Arc<C>, &ChangeNotifier, Capability) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        self.events = Some(Arc::new(decorator));
        self
    }
}

/// The `Post` specialization: cached `published`, eventful `publish` and `duplicate`.
pub fn post_specialization() -> Specialization<dyn PostRepository> {
    Specialization::new()
        .cache(|base: Arc<dyn PostRepository>, layer: &CacheLayer, capability| {
            let cache = layer.for_namespace(Namespace::of::<Post>());
            let cached: Arc<dyn PostRepository> =
                Arc::new(CachedPostRepository::decorate(base, cache, capability)?);
            Ok(cached)
        })
        .events(|base: Arc<dyn PostRepository>, notifier: &ChangeNotifier, capability| {
            let eventful: Arc<dyn PostRepository> = Arc::new(EventfulPostRepository::decorate(
                base,
                notifier.clone(),
                capability,
            )?);
            Ok(eventful)
        })
}

/// Composes decorated repositories from base repositories.
///
/// Holds the one [`CacheLayer`] and the one [`ChangeNotifier`] every chain
/// shares, so all repositories of an entity type see the same version
/// counters and the same invalidator.
pub struct RepositoryResolver {
    layer: CacheLayer,
    notifier: ChangeNotifier,
    specializations: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl RepositoryResolver {
    pub fn new(layer: CacheLayer, notifier: ChangeNotifier) -> Self {
        Self {
            layer,
            notifier,
            specializations: HashMap::new(),
        }
    }

    pub fn layer(&self) -> &CacheLayer {
        &self.layer
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Registers the specialized decorators for `C`'s entity type.
    ///
    /// A later registration for the same entity replaces the earlier one.
    pub fn specialize<C: Contract + ?Sized>(&mut self, specialization: Specialization<C>) -> &mut Self {
        self.specializations
            .insert(C::Entity::NAME, Box::new(specialization));
        self
    }

    /// Decorates `base` for its entity type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` when `capability` asks for
    /// soft deletes `base` does not implement, when the registered
    /// specialization is incomplete, or when it was registered for a
    /// different contract.
    pub fn resolve<C: Contract + ?Sized>(&self, base: Arc<C>, capability: Capability) -> Result<Arc<C>> {
        let entity = C::Entity::NAME;

        if capability == Capability::SoftDeletes && base.capability() != Capability::SoftDeletes {
            return Err(RepositoryError::Configuration(format!(
                "{entity} repository was bound with soft deletes it does not implement"
            )));
        }

        let Some(registered) = self.specializations.get(entity) else {
            tracing::debug!(entity, ?capability, "Resolved generic repository chain");
            return C::decorate_generic(base, capability, &self.layer, &self.notifier);
        };

        let specialization = registered
            .downcast_ref::<Specialization<C>>()
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "{entity} specialization was registered for a different contract"
                ))
            })?;

        match (&specialization.cache, &specialization.events) {
            (Some(cache), Some(events)) => {
                tracing::debug!(entity, ?capability, "Resolved specialized repository chain");
                let cached = cache(base, &self.layer, capability)?;
                events(cached, &self.notifier, capability)
            }
            (None, None) => {
                tracing::debug!(entity, ?capability, "Resolved generic repository chain");
                C::decorate_generic(base, capability, &self.layer, &self.notifier)
            }
            (Some(_), None) => Err(RepositoryError::Configuration(format!(
                "{entity} has a cache decorator but no event decorator"
            ))),
            (None, Some(_)) => Err(RepositoryError::Configuration(format!(
                "{entity} has an event decorator but no cache decorator"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use folio_core::cache::Cache;
    use folio_core::content::{attributes, Attributes, EntityId, Tag};
    use folio_core::events::{ChangeListener, RepositoryChanged};
    use folio_core::storage::{Columns, Page};
    use serde_json::json;

    use crate::cache::MemoryCache;
    use crate::config::CacheSettings;
    use crate::storage::inmemory::{InMemoryPostRepository, InMemoryRepository};

    #[derive(Default)]
    struct CountingListener {
        events: AtomicUsize,
    }

    #[async_trait]
    impl ChangeListener for CountingListener {
        async fn handle(&self, _event: &RepositoryChanged) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Tag store counting reads.
    struct CountingTags {
        inner: InMemoryRepository<Tag>,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl Repository for CountingTags {
        type Entity = Tag;

        async fn find(&self, id: EntityId, columns: &Columns) -> Result<Option<Tag>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.find(id, columns).await
        }

        async fn get_by_ids(&self, ids: &[EntityId], columns: &Columns) -> Result<Vec<Tag>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_ids(ids, columns).await
        }

        async fn paginate(&self, per_page: u64, page: u64, columns: &Columns) -> Result<Page<Tag>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.paginate(per_page, page, columns).await
        }

        async fn create(&self, attributes: Attributes) -> Result<Tag> {
            self.inner.create(attributes).await
        }

        async fn update(&self, id: EntityId, attributes: Attributes) -> Result<Tag> {
            self.inner.update(id, attributes).await
        }

        async fn delete(&self, id: EntityId) -> Result<bool> {
            self.inner.delete(id).await
        }

        async fn delete_many(&self, ids: &[EntityId]) -> Result<u64> {
            self.inner.delete_many(ids).await
        }
    }

    fn resolver() -> (Arc<MemoryCache>, RepositoryResolver) {
        let cache = Arc::new(MemoryCache::new(100));
        let layer = CacheLayer::new(cache.clone(), CacheSettings::default());
        let invalidator = Arc::new(layer.invalidator());
        let notifier = ChangeNotifier::new(invalidator);
        (cache, RepositoryResolver::new(layer, notifier))
    }

    #[tokio::test]
    async fn test_generic_chain_caches_and_invalidates() {
        let (_cache, resolver) = resolver();
        let store = Arc::new(CountingTags {
            inner: InMemoryRepository::new(),
            reads: AtomicUsize::new(0),
        });
        let base: Arc<dyn Repository<Entity = Tag>> = store.clone();

        let tags = resolver.resolve(base, Capability::Plain).unwrap();

        assert_eq!(tags.paginate(15, 1, &Columns::all()).await.unwrap().total, 0);
        assert_eq!(tags.paginate(15, 1, &Columns::all()).await.unwrap().total, 0);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        tags.create(attributes(json!({ "name": "a", "slug": "a" })).unwrap())
            .await
            .unwrap();

        assert_eq!(tags.paginate(15, 1, &Columns::all()).await.unwrap().total, 1);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generic_chain_with_soft_deletes() {
        let (_cache, resolver) = resolver();
        let base: Arc<dyn Repository<Entity = Tag>> =
            Arc::new(InMemoryRepository::<Tag>::soft_deleting());

        let tags = resolver.resolve(base, Capability::SoftDeletes).unwrap();

        assert_eq!(tags.capability(), Capability::SoftDeletes);
    }

    #[tokio::test]
    async fn test_soft_deletes_missing_on_base() {
        let (_cache, resolver) = resolver();
        let base: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());

        let result = resolver.resolve(base, Capability::SoftDeletes);

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_post_specialization_resolves() {
        let (cache, mut resolver) = resolver();
        resolver.specialize(post_specialization());
        let base: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::soft_deleting());

        let posts = resolver.resolve(base, Capability::SoftDeletes).unwrap();
        posts
            .create(attributes(json!({ "title": "Hello" })).unwrap())
            .await
            .unwrap();
        assert_eq!(posts.published(10, 1).await.unwrap().total, 0);
        assert!(cache.get("repo:Post:published:10:1:v1").await.unwrap().is_some());

        posts.publish(1).await.unwrap();

        assert!(cache.get("repo:Post:published:10:1:v1").await.unwrap().is_none());
        assert_eq!(posts.published(10, 1).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_post_contract_without_specialization_fails() {
        let (_cache, resolver) = resolver();
        let base: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::new());

        let result = resolver.resolve(base, Capability::Plain);

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_partial_specialization_is_configuration_error() {
        let (_cache, mut resolver) = resolver();
        resolver.specialize(
            Specialization::<dyn Repository<Entity = Tag>>::new()
                .cache(|base, _layer, _capability| Ok(base)),
        );
        let base: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());

        let result = resolver.resolve(base, Capability::Plain);

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_event_only_specialization_is_configuration_error() {
        let (_cache, mut resolver) = resolver();
        resolver.specialize(
            Specialization::<dyn Repository<Entity = Tag>>::new()
                .events(|base, _notifier, _capability| Ok(base)),
        );
        let base: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());

        assert!(resolver.resolve(base, Capability::Plain).is_err());
    }

    #[tokio::test]
    async fn test_empty_specialization_falls_back_to_generic() {
        let (_cache, mut resolver) = resolver();
        resolver.specialize(Specialization::<dyn Repository<Entity = Tag>>::new());
        let base: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());

        assert!(resolver.resolve(base, Capability::Plain).is_ok());
    }

    #[tokio::test]
    async fn test_specialization_for_other_contract_is_rejected() {
        let (_cache, mut resolver) = resolver();
        resolver.specialize(post_specialization());
        let base: Arc<dyn Repository<Entity = Post>> = Arc::new(InMemoryPostRepository::new());

        let result = resolver.resolve(base, Capability::Plain);

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_specialized_decorators_run_in_order() {
        let (_cache, mut resolver) = resolver();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let cache_order = order.clone();
        let event_order = order.clone();
        resolver.specialize(
            Specialization::<dyn Repository<Entity = Tag>>::new()
                .cache(move |base, _layer, _capability| {
                    cache_order.lock().unwrap().push("cache");
                    Ok(base)
                })
                .events(move |base, _notifier, _capability| {
                    event_order.lock().unwrap().push("events");
                    Ok(base)
                }),
        );
        let base: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());

        resolver.resolve(base, Capability::Plain).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["cache", "events"]);
    }

    #[tokio::test]
    async fn test_one_listener_shared_by_all_chains() {
        let listener = Arc::new(CountingListener::default());
        let layer = CacheLayer::new(Arc::new(MemoryCache::new(100)), CacheSettings::default());
        let resolver = RepositoryResolver::new(layer, ChangeNotifier::new(listener.clone()));

        let tags: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());
        let tags = resolver.resolve(tags, Capability::Plain).unwrap();
        let again: Arc<dyn Repository<Entity = Tag>> = Arc::new(InMemoryRepository::<Tag>::new());
        let again = resolver.resolve(again, Capability::Plain).unwrap();

        tags.create(attributes(json!({ "name": "a", "slug": "a" })).unwrap())
            .await
            .unwrap();
        again
            .create(attributes(json!({ "name": "b", "slug": "b" })).unwrap())
            .await
            .unwrap();

        assert_eq!(listener.events.load(Ordering::SeqCst), 2);
    }
}
