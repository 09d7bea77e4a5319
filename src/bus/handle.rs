//! Plugin-scoped bus handle
//!
//! Injected into afterPluginsReady callbacks so a plugin can subscribe and
//! emit without carrying its own id around.

use crate::bus::bus::{EventBus, ListenerError, Subscription};
use crate::bus::error::BusResult;
use crate::bus::hook::{Hook, SubscribeOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct PluginBusHandle {
    plugin_id: String,
    bus: Arc<EventBus>,
}

impl PluginBusHandle {
    pub(crate) fn new(plugin_id: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            bus,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Subscribe to a hook on behalf of the owning plugin
    pub async fn on_hook<T, F, Fut>(
        &self,
        hook: Hook<T>,
        listener: F,
        options: SubscribeOptions,
    ) -> BusResult<Subscription>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.bus
            .subscribe(&self.plugin_id, hook, listener, options)
            .await
    }

    /// Emit an event on a hook
    pub async fn emit_hook<T: Serialize>(&self, hook: Hook<T>, payload: &T) -> BusResult<()> {
        self.bus.emit(hook, payload).await
    }
}
