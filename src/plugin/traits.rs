//! Plugin Trait System
//!
//! The contract every backend plugin implements, plus the collaborator
//! boundaries the loader talks to: the HTTP layer that mounts plugin
//! routers and the catalog that maps manifest names to constructors.
//!
//! A plugin's only entry point is `register`: it declares everything it
//! provides and needs (services, extension points, permissions, routers)
//! through the `RegisterContext`, and hands the loader callbacks to run
//! in the later phases. Nothing executes at registration time.

use crate::plugin::context::RegisterContext;
use crate::plugin::error::PluginResult;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Base trait implemented by every backend plugin
#[async_trait::async_trait]
pub trait BackendPlugin: Send + Sync {
    /// Stable identifier, used for service scoping, schema naming, and
    /// work-queue namespacing
    fn plugin_id(&self) -> &str;

    /// Declare the plugin's services, dependencies, and lifecycle callbacks
    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()>;
}

/// Opaque router payload, forwarded untouched to the HTTP layer
pub type Router = Box<dyn Any + Send + Sync>;

/// Boundary to the HTTP routing collaborator
///
/// The loader mounts the API-dispatch route before any plugin initializes
/// so that a plugin's own init can call another already-initialized
/// plugin's RPC surface.
#[async_trait::async_trait]
pub trait HttpMount: Send + Sync {
    async fn mount_api_dispatch(&self) -> PluginResult<()>;

    async fn mount_router(&self, plugin_id: &str, router: Router) -> PluginResult<()>;
}

/// Default mount for hosts without an HTTP layer; routers are dropped
pub struct NullHttpMount;

#[async_trait::async_trait]
impl HttpMount for NullHttpMount {
    async fn mount_api_dispatch(&self) -> PluginResult<()> {
        log::trace!("No HTTP layer attached, API dispatch route not mounted");
        Ok(())
    }

    async fn mount_router(&self, plugin_id: &str, _router: Router) -> PluginResult<()> {
        log::debug!(
            "No HTTP layer attached, discarding router from plugin '{}'",
            plugin_id
        );
        Ok(())
    }
}

type PluginConstructor = Arc<dyn Fn() -> Arc<dyn BackendPlugin> + Send + Sync>;

/// Maps manifest names to plugin constructors
///
/// Discovery finds manifests on disk; the catalog supplies the code. A
/// manifest with no catalog entry is the "module failed to load" case:
/// logged with the expected path, and loading continues without it.
#[derive(Default)]
pub struct PluginCatalog {
    constructors: HashMap<String, PluginConstructor>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn BackendPlugin> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Arc::new(constructor))
            .is_some()
        {
            log::warn!(
                "Catalog entry '{}' was already present, previous constructor replaced",
                name
            );
        }
    }

    pub fn construct(&self, name: &str) -> Option<Arc<dyn BackendPlugin>> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}
