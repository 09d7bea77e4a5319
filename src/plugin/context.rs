//! Plugin registration context
//!
//! The surface a plugin sees during the Register phase. Everything a
//! plugin contributes to the runtime (services, dependencies, extension
//! points, permissions, routers) flows through this context; nothing is
//! executed until the loader has collected and sorted the full set.

use crate::extension::{ExtensionPoint, ExtensionPointManager, ExtensionProxy, ExtensionResult};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::initialization::{InitSpec, PendingInit};
use crate::plugin::traits::Router;
use crate::plugin::types::{Permission, RegisteredPermission};
use crate::services::{ServiceRef, ServiceRegistry, ServiceResult};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Registration surface handed to `BackendPlugin::register`
///
/// Borrowed from the loader for the duration of one plugin's register call;
/// the plugin id and manifest directory are fixed by the loader, so a
/// plugin can only ever register things under its own identity.
pub struct RegisterContext<'a> {
    plugin_id: String,
    plugin_dir: Option<PathBuf>,
    services: &'a Arc<ServiceRegistry>,
    extensions: &'a Arc<ExtensionPointManager>,
    pending: &'a mut Vec<PendingInit>,
    provided_by: &'a mut HashMap<String, String>,
    permissions: &'a mut Vec<RegisteredPermission>,
    routers: &'a mut Vec<(String, Router)>,
}

impl<'a> RegisterContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        plugin_id: String,
        plugin_dir: Option<PathBuf>,
        services: &'a Arc<ServiceRegistry>,
        extensions: &'a Arc<ExtensionPointManager>,
        pending: &'a mut Vec<PendingInit>,
        provided_by: &'a mut HashMap<String, String>,
        permissions: &'a mut Vec<RegisteredPermission>,
        routers: &'a mut Vec<(String, Router)>,
    ) -> Self {
        Self {
            plugin_id,
            plugin_dir,
            services,
            extensions,
            pending,
            provided_by,
            permissions,
            routers,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Directory the plugin's manifest was discovered in, when it was
    /// discovered rather than injected
    pub fn plugin_dir(&self) -> Option<&PathBuf> {
        self.plugin_dir.as_ref()
    }

    /// Queue the plugin's lifecycle callbacks for the later phases
    ///
    /// Nothing runs here; the loader sorts all pending initializations
    /// before the first `init` is invoked. At most one call per plugin.
    pub fn register_init(&mut self, spec: InitSpec) -> PluginResult<()> {
        if self.pending.iter().any(|p| p.plugin_id == self.plugin_id) {
            return Err(PluginError::ExecutionError {
                plugin_id: self.plugin_id.clone(),
                operation: "register_init".to_string(),
                cause: "init already registered for this plugin".to_string(),
            });
        }
        self.pending.push(PendingInit {
            plugin_id: self.plugin_id.clone(),
            plugin_dir: self.plugin_dir.clone(),
            deps: spec.deps,
            schema: spec.schema,
            init: Some(spec.init),
            after_plugins_ready: spec.after_plugins_ready,
        });
        Ok(())
    }

    /// Provide a singleton service to other plugins
    pub fn register_service<T>(&mut self, service: ServiceRef<T>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.services.register(service, value);
        self.provided_by
            .insert(service.id().to_string(), self.plugin_id.clone());
    }

    /// Provide a scoped service, constructed fresh per requesting plugin
    pub fn register_service_factory<T, F, Fut>(&mut self, service: ServiceRef<T>, factory: F)
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
    {
        self.services.register_factory(service, factory);
        self.provided_by
            .insert(service.id().to_string(), self.plugin_id.clone());
    }

    /// Attach an implementation to an extension point
    ///
    /// Calls buffered by consumers before this replay immediately, in
    /// original order. Providers that construct their implementation during
    /// init instead register through the manager handle from
    /// [`extensions`](Self::extensions).
    pub async fn register_extension_point<E>(
        &mut self,
        point: ExtensionPoint<E>,
        implementation: E,
    ) -> ExtensionResult<()>
    where
        E: Clone + Send + 'static,
    {
        self.extensions.register(point, implementation).await
    }

    /// Get the buffering proxy for an extension point
    ///
    /// Safe before the provider has registered; calls queue until an
    /// implementation attaches. The proxy is shared, so it can be captured
    /// into init closures.
    pub fn get_extension_point<E>(
        &self,
        point: ExtensionPoint<E>,
    ) -> ExtensionResult<Arc<ExtensionProxy<E>>>
    where
        E: Clone + Send + 'static,
    {
        self.extensions.proxy(point)
    }

    /// Shared extension manager handle, for providers whose implementation
    /// only exists once their own init has run
    pub fn extensions(&self) -> Arc<ExtensionPointManager> {
        Arc::clone(self.extensions)
    }

    /// Record permissions owned by this plugin
    ///
    /// Ids are namespaced `"{plugin_id}.{raw_id}"` so two plugins
    /// registering the same raw id never collide. The loader emits one
    /// `core.permissionsRegistered` event per plugin once all plugins are
    /// ready.
    pub fn register_permissions(&mut self, permissions: &[Permission]) {
        for permission in permissions {
            self.permissions.push(RegisteredPermission {
                plugin_id: self.plugin_id.clone(),
                permission_id: format!("{}.{}", self.plugin_id, permission.id),
                description: permission.description.clone(),
            });
        }
    }

    /// Hand a router to the HTTP layer
    ///
    /// Opaque to the runtime; forwarded to the `HttpMount` collaborator
    /// before any plugin initializes.
    pub fn register_router(&mut self, router: Router) {
        self.routers.push((self.plugin_id.clone(), router));
    }
}
