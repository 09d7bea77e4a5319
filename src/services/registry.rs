//! ServiceRegistry implementation
//!
//! Stores service implementations type-erased behind their `ServiceRef` id.
//! A stored value must be `Clone` (in practice an `Arc<...>` handle or a
//! cheap shared struct), so resolution hands each consumer its own copy of
//! the handle without the registry knowing the concrete type.

use crate::services::error::{ServiceError, ServiceResult};
use futures::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// Typed token identifying a service contract
///
/// Uniqueness of `id` is load-bearing: two plugins registering the same id
/// overwrite each other (last writer wins) with a logged warning.
pub struct ServiceRef<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ServiceRef<T> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for ServiceRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ServiceRef<T> {}

impl<T> std::fmt::Debug for ServiceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServiceRef({})", self.id)
    }
}

type StoredService = Arc<dyn Any + Send + Sync>;
type StoredFactory =
    Arc<dyn Fn(String) -> BoxFuture<'static, ServiceResult<StoredService>> + Send + Sync>;

/// Identity-keyed store of singleton services and per-consumer factories
pub struct ServiceRegistry {
    singletons: RwLock<HashMap<String, StoredService>>,
    factories: RwLock<HashMap<String, StoredFactory>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            singletons: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Install a process-wide singleton, last-write-wins
    pub fn register<T>(&self, service: ServiceRef<T>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut singletons = self.singletons.write().unwrap();
        if singletons
            .insert(service.id().to_string(), Arc::new(value))
            .is_some()
        {
            log::warn!(
                "Service '{}' was already registered, previous implementation replaced",
                service.id()
            );
        }
    }

    /// Install a scoped provider, invoked fresh for every resolution
    ///
    /// The factory receives the *requesting* plugin's id, never a provider's.
    /// Factories may have side effects per call (e.g. opening a pooled
    /// connection); caching expensive results is the factory's business, the
    /// registry never memoizes.
    pub fn register_factory<T, F, Fut>(&self, service: ServiceRef<T>, factory: F)
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
    {
        let factory = Arc::new(factory);
        let erased: StoredFactory = Arc::new(move |plugin_id: String| {
            let factory = Arc::clone(&factory);
            Box::pin(async move {
                let value = factory(plugin_id).await?;
                Ok(Arc::new(value) as StoredService)
            })
        });

        let mut factories = self.factories.write().unwrap();
        if factories.insert(service.id().to_string(), erased).is_some() {
            log::warn!(
                "Service factory '{}' was already registered, previous factory replaced",
                service.id()
            );
        }
    }

    /// Resolve a service for the given plugin
    ///
    /// The factory table is consulted first, then the singleton table.
    pub async fn get<T>(&self, service: ServiceRef<T>, plugin_id: &str) -> ServiceResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let stored = self.get_erased(service.id(), plugin_id).await?;
        stored
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ServiceError::TypeMismatch {
                service_id: service.id().to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// Type-erased resolution by raw service id, used for dependency bags
    pub(crate) async fn get_erased(
        &self,
        service_id: &str,
        plugin_id: &str,
    ) -> ServiceResult<StoredService> {
        // Factory lookup first; clone the factory out so no lock is held
        // across the await
        let factory = {
            let factories = self.factories.read().unwrap();
            factories.get(service_id).cloned()
        };
        if let Some(factory) = factory {
            log::trace!(
                "Resolving service '{}' through factory for plugin '{}'",
                service_id,
                plugin_id
            );
            return factory(plugin_id.to_string()).await;
        }

        let singletons = self.singletons.read().unwrap();
        match singletons.get(service_id) {
            Some(stored) => Ok(Arc::clone(stored)),
            None => Err(ServiceError::NotFound {
                service_id: service_id.to_string(),
                plugin_id: plugin_id.to_string(),
            }),
        }
    }

    /// Check whether a service id is registered (singleton or factory)
    pub fn has_service(&self, service_id: &str) -> bool {
        self.factories.read().unwrap().contains_key(service_id)
            || self.singletons.read().unwrap().contains_key(service_id)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const CONFIG: ServiceRef<Arc<String>> = ServiceRef::new("test.config");
    const COUNTER: ServiceRef<u32> = ServiceRef::new("test.counter");
    const SCOPED: ServiceRef<Arc<String>> = ServiceRef::new("test.scoped");

    #[tokio::test]
    async fn test_singleton_registration_and_lookup() {
        let registry = ServiceRegistry::new();
        registry.register(CONFIG, Arc::new("production".to_string()));

        let resolved = registry.get(CONFIG, "consumer").await.unwrap();
        assert_eq!(*resolved, "production");
    }

    #[tokio::test]
    async fn test_missing_service_names_ref_and_plugin() {
        let registry = ServiceRegistry::new();

        let result = registry.get(COUNTER, "lonely-plugin").await;
        match result.unwrap_err() {
            ServiceError::NotFound {
                service_id,
                plugin_id,
            } => {
                assert_eq!(service_id, "test.counter");
                assert_eq!(plugin_id, "lonely-plugin");
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_last_writer_wins() {
        let registry = ServiceRegistry::new();
        registry.register(COUNTER, 1);
        registry.register(COUNTER, 2);

        let resolved = registry.get(COUNTER, "p").await.unwrap();
        assert_eq!(resolved, 2);
    }

    #[tokio::test]
    async fn test_factory_receives_requesting_plugin_id() {
        let registry = ServiceRegistry::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&seen);
        registry.register_factory(SCOPED, move |plugin_id: String| {
            let recorded = Arc::clone(&recorded);
            async move {
                recorded.lock().unwrap().push(plugin_id.clone());
                Ok(Arc::new(format!("conn-{plugin_id}")))
            }
        });

        let a = registry.get(SCOPED, "alpha").await.unwrap();
        let b = registry.get(SCOPED, "beta").await.unwrap();

        assert_eq!(*a, "conn-alpha");
        assert_eq!(*b, "conn-beta");
        assert_eq!(*seen.lock().unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_factory_invoked_fresh_per_resolution() {
        let registry = ServiceRegistry::new();
        let calls = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&calls);
        registry.register_factory(COUNTER, move |_plugin_id: String| {
            let counter = Arc::clone(&counter);
            async move {
                let mut calls = counter.lock().unwrap();
                *calls += 1;
                Ok(*calls)
            }
        });

        assert_eq!(registry.get(COUNTER, "p").await.unwrap(), 1);
        assert_eq!(registry.get(COUNTER, "p").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_factory_table_consulted_before_singletons() {
        let registry = ServiceRegistry::new();
        registry.register(COUNTER, 7);
        registry.register_factory(COUNTER, |_plugin_id: String| async move { Ok(42) });

        assert_eq!(registry.get(COUNTER, "p").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported() {
        let registry = ServiceRegistry::new();
        registry.register(ServiceRef::<u32>::new("test.shared"), 5);

        let wrong: ServiceRef<String> = ServiceRef::new("test.shared");
        let result = registry.get(wrong, "p").await;
        assert!(matches!(
            result.unwrap_err(),
            ServiceError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_has_service() {
        let registry = ServiceRegistry::new();
        assert!(!registry.has_service("test.counter"));

        registry.register(COUNTER, 1);
        assert!(registry.has_service("test.counter"));
    }
}
