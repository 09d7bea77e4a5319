//! Plugin loader
//!
//! Orchestrates one process boot: discover plugin manifests, run every
//! plugin's `register`, sort the pending initializations, initialize each
//! plugin in dependency order, then run the afterPluginsReady callbacks.
//! Phases are strictly sequential across plugins: plugin N+1's init never
//! starts before plugin N's init future settles, since later plugins may
//! depend on earlier ones' side effects.
//!
//! Only a circular dependency aborts a load. Every other failure (a
//! manifest that resolves to no known constructor, an incompatible API
//! version, a register error, a missing service, a failed migration, a
//! thrown init) is logged, recorded in the [`LoadReport`], and does not
//! stop the remaining plugins.
//!
//! The loader owns the service registry, extension point manager, and
//! event bus for its boot; they are threaded explicitly into plugins
//! rather than reached through globals.

use crate::bus::{EventBus, PluginBusHandle};
use crate::extension::ExtensionPointManager;
use crate::plugin::context::RegisterContext;
use crate::plugin::deps::{DepsSpec, ResolvedDeps};
use crate::plugin::discovery::{discover_manifests, DiscoveryConfig};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::events::{PermissionRecord, PermissionsRegistered, PERMISSIONS_REGISTERED};
use crate::plugin::initialization::{PendingInit, ReadyContext};
use crate::plugin::sorter::sort_plugins;
use crate::plugin::traits::{BackendPlugin, HttpMount, NullHttpMount, PluginCatalog, Router};
use crate::plugin::types::{LoadPhase, LoadReport, PluginFailure, RegisteredPermission};
use crate::queue::{MemoryQueueFactory, QueueFactory};
use crate::services::ServiceRegistry;
use crate::store::{MemoryStoreProvider, SchemaStore, StoreProvider};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Three-phase plugin loader, one instance per process boot
pub struct PluginLoader {
    api_version: u32,
    services: Arc<ServiceRegistry>,
    extensions: Arc<ExtensionPointManager>,
    bus: Arc<EventBus>,
    stores: Arc<dyn StoreProvider>,
    http: Arc<dyn HttpMount>,
    catalog: PluginCatalog,
    discovery: DiscoveryConfig,
    injected: Vec<(Arc<dyn BackendPlugin>, Option<PathBuf>)>,
    pending: Vec<PendingInit>,
    provided_by: HashMap<String, String>,
    permissions: Vec<RegisteredPermission>,
    routers: Vec<(String, Router)>,
}

impl PluginLoader {
    /// Loader with in-memory collaborators and no filesystem discovery
    pub fn new() -> Self {
        Self {
            api_version: crate::get_plugin_api_version(),
            services: Arc::new(ServiceRegistry::new()),
            extensions: Arc::new(ExtensionPointManager::new()),
            bus: Arc::new(EventBus::new(Arc::new(MemoryQueueFactory::new()))),
            stores: Arc::new(MemoryStoreProvider::new()),
            http: Arc::new(NullHttpMount),
            catalog: PluginCatalog::new(),
            discovery: DiscoveryConfig::none(),
            injected: Vec::new(),
            pending: Vec::new(),
            provided_by: HashMap::new(),
            permissions: Vec::new(),
            routers: Vec::new(),
        }
    }

    /// Back work-queue subscriptions with a different queue backend
    pub fn with_queue_factory(mut self, factory: Arc<dyn QueueFactory>) -> Self {
        self.bus = Arc::new(EventBus::new(factory));
        self
    }

    /// Back schema-scoped stores with a different persistence provider
    pub fn with_store_provider(mut self, stores: Arc<dyn StoreProvider>) -> Self {
        self.stores = stores;
        self
    }

    /// Attach the HTTP routing collaborator
    pub fn with_http_mount(mut self, http: Arc<dyn HttpMount>) -> Self {
        self.http = http;
        self
    }

    /// Supply constructors for discovered manifests
    pub fn with_catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Configure manifest discovery paths
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Add a plugin directly, bypassing discovery and the catalog
    pub fn inject_plugin(&mut self, plugin: Arc<dyn BackendPlugin>) {
        self.injected.push((plugin, None));
    }

    /// Add a plugin directly, with a directory for its migrations
    pub fn inject_plugin_at(&mut self, plugin: Arc<dyn BackendPlugin>, dir: impl Into<PathBuf>) {
        self.injected.push((plugin, Some(dir.into())));
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn services(&self) -> Arc<ServiceRegistry> {
        Arc::clone(&self.services)
    }

    pub fn extensions(&self) -> Arc<ExtensionPointManager> {
        Arc::clone(&self.extensions)
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// All permissions recorded during the Register phase, namespaced by
    /// their owning plugin
    pub fn registered_permissions(&self) -> &[RegisteredPermission] {
        &self.permissions
    }

    /// Run the full three-phase lifecycle
    ///
    /// Fails only on a circular dependency or an unreadable installed
    /// plugin table; per-plugin failures land in the returned report.
    pub async fn load(&mut self) -> PluginResult<LoadReport> {
        let mut report = LoadReport::default();

        self.register_phase(&mut report).await?;
        self.init_phase(&mut report).await?;
        self.after_plugins_ready_phase(&mut report).await;

        log::info!(
            "Plugin loading complete: {} initialized, {} skipped, {} failed",
            report.initialized.len(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Stop the event bus's queue consumers
    pub async fn shutdown(&self) {
        if let Err(error) = self.bus.shutdown().await {
            log::warn!("Event bus shutdown reported an error: {}", error);
        }
    }

    // Phase 1: discover manifests and run every plugin's register callback.

    async fn register_phase(&mut self, report: &mut LoadReport) -> PluginResult<()> {
        let discovered = discover_manifests(&self.discovery).await?;

        for entry in discovered {
            let name = entry.manifest.name.clone();
            if !self.is_api_compatible(entry.manifest.api_version) {
                log::warn!(
                    "Skipping plugin '{}': API version {} is incompatible with runtime {}",
                    name,
                    entry.manifest.api_version,
                    self.api_version
                );
                report.skipped.push(name);
                continue;
            }
            match self.catalog.construct(&name) {
                Some(plugin) => {
                    log::trace!(
                        "Resolved plugin '{}' ({:?} manifest, v{})",
                        name,
                        entry.source,
                        entry.manifest.version
                    );
                    self.register_plugin(plugin, Some(entry.plugin_dir), report)
                        .await;
                }
                None => {
                    log::error!(
                        "Plugin '{}' has no registered constructor; expected module at {}",
                        name,
                        entry.plugin_dir.display()
                    );
                    report.skipped.push(name);
                }
            }
        }

        let injected = std::mem::take(&mut self.injected);
        for (plugin, dir) in injected {
            self.register_plugin(plugin, dir, report).await;
        }

        Ok(())
    }

    async fn register_plugin(
        &mut self,
        plugin: Arc<dyn BackendPlugin>,
        plugin_dir: Option<PathBuf>,
        report: &mut LoadReport,
    ) {
        let plugin_id = plugin.plugin_id().to_string();
        log::debug!("Registering plugin '{}'", plugin_id);

        let mut ctx = RegisterContext::new(
            plugin_id.clone(),
            plugin_dir,
            &self.services,
            &self.extensions,
            &mut self.pending,
            &mut self.provided_by,
            &mut self.permissions,
            &mut self.routers,
        );
        if let Err(error) = plugin.register(&mut ctx).await {
            log::error!("Plugin '{}' failed to register: {}", plugin_id, error);
            // A half-registered plugin must not reach the init phase
            self.pending.retain(|p| p.plugin_id != plugin_id);
            report.failures.push(PluginFailure {
                plugin_id,
                phase: LoadPhase::Register,
                error: error.to_string(),
            });
        }
    }

    /// Same major (year) component means compatible
    fn is_api_compatible(&self, plugin_api_version: u32) -> bool {
        major_version(self.api_version) == major_version(plugin_api_version)
    }

    // Phase 2: sort, mount routes, then initialize in dependency order.

    async fn init_phase(&mut self, report: &mut LoadReport) -> PluginResult<()> {
        let sorted = sort_plugins(&self.pending, &self.provided_by)?;
        log::info!("Initializing {} plugins in dependency order", sorted.len());

        // The dispatch route goes up first so a plugin's init can call an
        // already-initialized plugin's RPC surface
        if let Err(error) = self.http.mount_api_dispatch().await {
            log::error!("Failed to mount API dispatch route: {}", error);
        }
        let routers = std::mem::take(&mut self.routers);
        for (plugin_id, router) in routers {
            if let Err(error) = self.http.mount_router(&plugin_id, router).await {
                log::error!(
                    "Failed to mount router for plugin '{}': {}",
                    plugin_id,
                    error
                );
            }
        }

        for plugin_id in sorted {
            self.init_plugin(&plugin_id, report).await;
        }
        Ok(())
    }

    async fn init_plugin(&mut self, plugin_id: &str, report: &mut LoadReport) {
        let (deps, schema, plugin_dir, init) = {
            let entry = match self.pending.iter_mut().find(|p| p.plugin_id == plugin_id) {
                Some(entry) => entry,
                None => return,
            };
            (
                entry.deps.clone(),
                entry.schema,
                entry.plugin_dir.clone(),
                entry.init.take(),
            )
        };
        let init = match init {
            Some(init) => init,
            None => return,
        };

        let store = if schema {
            match self.open_store(plugin_id, plugin_dir.as_deref()).await {
                Ok(store) => Some(store),
                Err(error) => {
                    log::error!("Failed to open store for plugin '{}': {}", plugin_id, error);
                    report.failures.push(PluginFailure {
                        plugin_id: plugin_id.to_string(),
                        phase: LoadPhase::Init,
                        error: error.to_string(),
                    });
                    return;
                }
            }
        } else {
            None
        };

        let resolved = match self.resolve_deps(&deps, plugin_id, store).await {
            Ok(resolved) => resolved,
            Err(error) => {
                log::error!("{}", error);
                report.failures.push(PluginFailure {
                    plugin_id: plugin_id.to_string(),
                    phase: LoadPhase::Init,
                    error: error.to_string(),
                });
                return;
            }
        };

        match init(resolved).await {
            Ok(()) => {
                log::debug!("Plugin '{}' initialized", plugin_id);
                report.initialized.push(plugin_id.to_string());
            }
            Err(error) => {
                log::error!("Plugin '{}' failed to initialize: {}", plugin_id, error);
                report.failures.push(PluginFailure {
                    plugin_id: plugin_id.to_string(),
                    phase: LoadPhase::Init,
                    error: error.to_string(),
                });
            }
        }
    }

    async fn open_store(
        &self,
        plugin_id: &str,
        plugin_dir: Option<&Path>,
    ) -> PluginResult<Arc<dyn SchemaStore>> {
        let store =
            self.stores
                .open(plugin_id)
                .await
                .map_err(|e| PluginError::ExecutionError {
                    plugin_id: plugin_id.to_string(),
                    operation: "open schema store".to_string(),
                    cause: e.to_string(),
                })?;

        if let Some(dir) = plugin_dir {
            let migrations = dir.join("migrations");
            if migrations.is_dir() {
                // Migration failure is soft: logged, init continues
                if let Err(error) = self.stores.run_migrations(plugin_id, &migrations).await {
                    log::error!("Migrations for plugin '{}' failed: {}", plugin_id, error);
                }
            }
        }

        Ok(store)
    }

    async fn resolve_deps(
        &self,
        deps: &DepsSpec,
        plugin_id: &str,
        store: Option<Arc<dyn SchemaStore>>,
    ) -> PluginResult<ResolvedDeps> {
        let mut services = HashMap::new();
        for (key, service_id) in deps.entries() {
            let stored = self
                .services
                .get_erased(service_id, plugin_id)
                .await
                .map_err(|e| PluginError::DependencyError {
                    plugin_id: plugin_id.to_string(),
                    cause: e.to_string(),
                })?;
            services.insert(key.clone(), stored);
        }
        Ok(ResolvedDeps::new(plugin_id.to_string(), services, store))
    }

    // Phase 3: permissions events, then the ready callbacks in the order
    // plugins were registered.

    async fn after_plugins_ready_phase(&mut self, report: &mut LoadReport) {
        self.emit_permissions().await;

        for idx in 0..self.pending.len() {
            let (plugin_id, deps, schema, callback) = {
                let entry = &mut self.pending[idx];
                let callback = match entry.after_plugins_ready.take() {
                    Some(callback) => callback,
                    None => continue,
                };
                (
                    entry.plugin_id.clone(),
                    entry.deps.clone(),
                    entry.schema,
                    callback,
                )
            };

            let store = if schema {
                match self.stores.open(&plugin_id).await {
                    Ok(store) => Some(store),
                    Err(error) => {
                        log::error!(
                            "Failed to reopen store for plugin '{}': {}",
                            plugin_id,
                            error
                        );
                        report.failures.push(PluginFailure {
                            plugin_id,
                            phase: LoadPhase::AfterPluginsReady,
                            error: error.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                None
            };

            let resolved = match self.resolve_deps(&deps, &plugin_id, store).await {
                Ok(resolved) => resolved,
                Err(error) => {
                    log::error!("{}", error);
                    report.failures.push(PluginFailure {
                        plugin_id,
                        phase: LoadPhase::AfterPluginsReady,
                        error: error.to_string(),
                    });
                    continue;
                }
            };

            let ctx = ReadyContext {
                deps: resolved,
                bus: PluginBusHandle::new(plugin_id.clone(), Arc::clone(&self.bus)),
            };
            if let Err(error) = callback(ctx).await {
                log::error!(
                    "Plugin '{}' failed in afterPluginsReady: {}",
                    plugin_id,
                    error
                );
                report.failures.push(PluginFailure {
                    plugin_id,
                    phase: LoadPhase::AfterPluginsReady,
                    error: error.to_string(),
                });
            }
        }

        // PendingInit entries are spent once this phase completes
        self.pending.clear();
    }

    async fn emit_permissions(&self) {
        let mut grouped: Vec<(String, Vec<PermissionRecord>)> = Vec::new();
        for permission in &self.permissions {
            let record = PermissionRecord {
                id: permission.permission_id.clone(),
                description: permission.description.clone(),
            };
            match grouped
                .iter_mut()
                .find(|(plugin_id, _)| *plugin_id == permission.plugin_id)
            {
                Some((_, records)) => records.push(record),
                None => grouped.push((permission.plugin_id.clone(), vec![record])),
            }
        }

        for (plugin_id, permissions) in grouped {
            let payload = PermissionsRegistered {
                plugin_id: plugin_id.clone(),
                permissions,
            };
            if let Err(error) = self.bus.emit(PERMISSIONS_REGISTERED, &payload).await {
                log::error!(
                    "Failed to emit permissions event for plugin '{}': {}",
                    plugin_id,
                    error
                );
            }
        }
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn major_version(api_version: u32) -> u32 {
    api_version / 10000
}
