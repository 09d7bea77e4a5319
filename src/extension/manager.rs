//! ExtensionPointManager implementation

use crate::extension::error::{ExtensionError, ExtensionResult};
use crate::extension::proxy::ExtensionProxy;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Typed token identifying an extension point
///
/// Same identity discipline as `ServiceRef`: the string id is the identity,
/// and duplicate registrations are last-writer-wins with a logged warning.
pub struct ExtensionPoint<E> {
    id: &'static str,
    _marker: PhantomData<fn() -> E>,
}

impl<E> ExtensionPoint<E> {
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

impl<E> Clone for ExtensionPoint<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ExtensionPoint<E> {}

impl<E> std::fmt::Debug for ExtensionPoint<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExtensionPoint({})", self.id)
    }
}

/// Hands out buffering proxies and binds implementations to them
///
/// One manager instance exists per runtime boot, owned by the plugin loader.
/// Proxies are memoized by point id: every consumer asking for the same
/// point shares the same proxy, so calls buffered by one consumer replay
/// on the implementation registered by another.
pub struct ExtensionPointManager {
    proxies: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ExtensionPointManager {
    pub fn new() -> Self {
        Self {
            proxies: Mutex::new(HashMap::new()),
        }
    }

    /// Get (creating once) the proxy for an extension point
    ///
    /// Safe to call before any provider registered; calls made through the
    /// returned proxy queue until `register` attaches an implementation.
    pub fn proxy<E>(&self, point: ExtensionPoint<E>) -> ExtensionResult<Arc<ExtensionProxy<E>>>
    where
        E: Clone + Send + 'static,
    {
        let mut proxies = self.proxies.lock().unwrap();

        if let Some(existing) = proxies.get(point.id()) {
            return Arc::downcast::<ExtensionProxy<E>>(Arc::clone(existing)).map_err(|_| {
                ExtensionError::TypeMismatch {
                    point_id: point.id().to_string(),
                    expected: std::any::type_name::<E>().to_string(),
                }
            });
        }

        let proxy = Arc::new(ExtensionProxy::new(point.id()));
        proxies.insert(
            point.id().to_string(),
            Arc::clone(&proxy) as Arc<dyn Any + Send + Sync>,
        );
        Ok(proxy)
    }

    /// Attach an implementation and immediately replay buffered calls
    ///
    /// Replays happen in original call order, exactly once; subsequent calls
    /// on the proxy forward directly to the implementation.
    pub async fn register<E>(
        &self,
        point: ExtensionPoint<E>,
        implementation: E,
    ) -> ExtensionResult<()>
    where
        E: Clone + Send + 'static,
    {
        let proxy = self.proxy(point)?;
        let replayed = proxy.bind(implementation).await;
        if replayed > 0 {
            log::debug!(
                "Replayed {} buffered calls on extension point '{}'",
                replayed,
                point.id()
            );
        }
        Ok(())
    }
}

impl Default for ExtensionPointManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    const GREETER: ExtensionPoint<Arc<Recorder>> = ExtensionPoint::new("test.greeter");

    #[tokio::test]
    async fn test_calls_before_registration_replay_in_order_once() {
        let manager = ExtensionPointManager::new();
        let proxy = manager.proxy(GREETER).unwrap();

        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("first") })
            .await;
        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("second") })
            .await;
        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("third") })
            .await;

        assert!(!proxy.is_bound());
        assert_eq!(proxy.buffered_calls(), 3);

        let implementation = Arc::new(Recorder::default());
        manager
            .register(GREETER, Arc::clone(&implementation))
            .await
            .unwrap();

        assert_eq!(implementation.calls(), vec!["first", "second", "third"]);
        assert_eq!(proxy.buffered_calls(), 0);
    }

    #[tokio::test]
    async fn test_calls_after_registration_forward_immediately() {
        let manager = ExtensionPointManager::new();
        let implementation = Arc::new(Recorder::default());
        manager
            .register(GREETER, Arc::clone(&implementation))
            .await
            .unwrap();

        let proxy = manager.proxy(GREETER).unwrap();
        assert!(proxy.is_bound());

        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("direct") })
            .await;

        assert_eq!(implementation.calls(), vec!["direct"]);
        assert_eq!(proxy.buffered_calls(), 0);
    }

    #[tokio::test]
    async fn test_proxy_is_memoized_by_point_id() {
        let manager = ExtensionPointManager::new();

        // Two consumers asking for the same point share one buffer
        let first = manager.proxy(GREETER).unwrap();
        let second = manager.proxy(GREETER).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first
            .invoke(|r: Arc<Recorder>| async move { r.record("from-first") })
            .await;
        second
            .invoke(|r: Arc<Recorder>| async move { r.record("from-second") })
            .await;

        let implementation = Arc::new(Recorder::default());
        manager
            .register(GREETER, Arc::clone(&implementation))
            .await
            .unwrap();

        assert_eq!(implementation.calls(), vec!["from-first", "from-second"]);
    }

    #[tokio::test]
    async fn test_reregistration_is_last_writer_wins() {
        let manager = ExtensionPointManager::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        manager.register(GREETER, Arc::clone(&first)).await.unwrap();
        manager
            .register(GREETER, Arc::clone(&second))
            .await
            .unwrap();

        let proxy = manager.proxy(GREETER).unwrap();
        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("hello") })
            .await;

        assert!(first.calls().is_empty());
        assert_eq!(second.calls(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_conflicting_proxy_type_is_rejected() {
        let manager = ExtensionPointManager::new();
        let _typed = manager.proxy(GREETER).unwrap();

        let conflicting: ExtensionPoint<Arc<String>> = ExtensionPoint::new("test.greeter");
        let result = manager.proxy(conflicting);

        match result.unwrap_err() {
            ExtensionError::TypeMismatch { point_id, .. } => {
                assert_eq!(point_id, "test.greeter");
            }
        }
    }

    #[tokio::test]
    async fn test_buffer_is_not_replayed_twice() {
        let manager = ExtensionPointManager::new();
        let proxy = manager.proxy(GREETER).unwrap();

        proxy
            .invoke(|r: Arc<Recorder>| async move { r.record("buffered") })
            .await;

        let first = Arc::new(Recorder::default());
        manager.register(GREETER, Arc::clone(&first)).await.unwrap();
        assert_eq!(first.calls(), vec!["buffered"]);

        // A replacement binding must not see the drained buffer again
        let second = Arc::new(Recorder::default());
        manager
            .register(GREETER, Arc::clone(&second))
            .await
            .unwrap();
        assert!(second.calls().is_empty());
    }
}
