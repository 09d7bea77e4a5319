//! Plugin Runtime
//!
//! Discovers independently-packaged backend plugins, lets them declare
//! the services they provide and depend on, resolves a safe
//! initialization order, and wires them together through the service
//! registry, extension points, and the event bus.
//!
//! A boot runs three phases, each strictly sequential across plugins:
//!
//! 1. **Register**: every plugin's `register` populates the registries
//!    and queues a pending initialization; nothing executes yet.
//! 2. **Init**: pending initializations run in topologically sorted
//!    order, each with freshly resolved dependencies.
//! 3. **AfterPluginsReady**: permissions events are emitted and the
//!    ready callbacks run, with event bus access, in registration order.
//!
//! There is no cancellation or timeout primitive here: a hung init or
//! listener stalls its phase indefinitely. That is a documented
//! limitation of this core, not a feature.

mod context;
mod deps;
mod discovery;
mod error;
mod events;
mod initialization;
mod loader;
mod sorter;
mod traits;
mod types;

pub use context::RegisterContext;
pub use deps::{DepsSpec, ResolvedDeps};
pub use discovery::DiscoveryConfig;
pub use error::{PluginError, PluginResult};
pub use events::{PermissionRecord, PermissionsRegistered, PERMISSIONS_REGISTERED};
pub use initialization::{InitSpec, ReadyContext};
pub use loader::PluginLoader;
pub use sorter::{QUEUE_FACTORY, QUEUE_PLUGIN_REGISTRY};
pub use traits::{BackendPlugin, HttpMount, NullHttpMount, PluginCatalog, Router};
pub use types::{
    DiscoveredManifest, LoadPhase, LoadReport, ManifestSource, Permission, PluginFailure,
    PluginManifest, RegisteredPermission,
};

#[cfg(test)]
mod tests;
