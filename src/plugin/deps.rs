//! Typed dependency declarations and resolution
//!
//! A plugin declares its dependencies as a small ordered set of bindings
//! from a local key to a typed `ServiceRef`. The loader resolves the set
//! into a `ResolvedDeps` bag, passing the plugin's own id to every
//! factory-backed service, and the plugin recovers typed handles by key.

use crate::plugin::error::{PluginError, PluginResult};
use crate::services::ServiceRef;
use crate::store::SchemaStore;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Insertion-ordered dependency declaration
#[derive(Debug, Clone, Default)]
pub struct DepsSpec {
    entries: Vec<(String, String)>,
}

impl DepsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a local key to a service the plugin depends on
    pub fn with<T>(mut self, key: impl Into<String>, service: ServiceRef<T>) -> Self {
        self.entries.push((key.into(), service.id().to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, service_id)| service_id.as_str())
    }

    pub fn depends_on(&self, service_id: &str) -> bool {
        self.entries.iter().any(|(_, id)| id == service_id)
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Dependencies resolved for one plugin, keyed by the declared binding keys
pub struct ResolvedDeps {
    plugin_id: String,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
    store: Option<Arc<dyn SchemaStore>>,
}

impl ResolvedDeps {
    pub(crate) fn new(
        plugin_id: String,
        services: HashMap<String, Arc<dyn Any + Send + Sync>>,
        store: Option<Arc<dyn SchemaStore>>,
    ) -> Self {
        Self {
            plugin_id,
            services,
            store,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Recover the typed service bound to a declared key
    pub fn get<T>(&self, key: &str) -> PluginResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let stored = self
            .services
            .get(key)
            .ok_or_else(|| PluginError::DependencyError {
                plugin_id: self.plugin_id.clone(),
                cause: format!("no dependency declared under key '{key}'"),
            })?;
        stored
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| PluginError::DependencyError {
                plugin_id: self.plugin_id.clone(),
                cause: format!(
                    "dependency '{}' is not a {}",
                    key,
                    std::any::type_name::<T>()
                ),
            })
    }

    /// The plugin's schema-scoped store handle, present when it declared one
    pub fn store(&self) -> Option<Arc<dyn SchemaStore>> {
        self.store.clone()
    }
}
