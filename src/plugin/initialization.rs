//! Pending initialization records
//!
//! `register_init` appends one of these during the Register phase; nothing
//! runs until the loader has sorted the full set. The `init` callback is
//! consumed during the Init phase, `after_plugins_ready` during the final
//! phase, each with a freshly resolved dependency bag.

use crate::bus::PluginBusHandle;
use crate::plugin::deps::{DepsSpec, ResolvedDeps};
use crate::plugin::error::PluginResult;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::PathBuf;

pub type InitFn = Box<dyn FnOnce(ResolvedDeps) -> BoxFuture<'static, PluginResult<()>> + Send>;
pub type ReadyFn = Box<dyn FnOnce(ReadyContext) -> BoxFuture<'static, PluginResult<()>> + Send>;

/// What a plugin hands to `register_init`
pub struct InitSpec {
    pub(crate) deps: DepsSpec,
    pub(crate) schema: bool,
    pub(crate) init: InitFn,
    pub(crate) after_plugins_ready: Option<ReadyFn>,
}

impl InitSpec {
    pub fn new<F, Fut>(deps: DepsSpec, init: F) -> Self
    where
        F: FnOnce(ResolvedDeps) -> Fut + Send + 'static,
        Fut: Future<Output = PluginResult<()>> + Send + 'static,
    {
        Self {
            deps,
            schema: false,
            init: Box::new(move |resolved| Box::pin(init(resolved))),
            after_plugins_ready: None,
        }
    }

    /// Request a schema-scoped store handle (`plugin_<id>`) in the
    /// resolved dependency bag, with migrations applied first
    pub fn with_schema(mut self) -> Self {
        self.schema = true;
        self
    }

    pub fn with_after_plugins_ready<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(ReadyContext) -> Fut + Send + 'static,
        Fut: Future<Output = PluginResult<()>> + Send + 'static,
    {
        self.after_plugins_ready = Some(Box::new(move |ctx| Box::pin(callback(ctx))));
        self
    }
}

/// Context passed to afterPluginsReady callbacks
///
/// Dependencies are re-resolved for this phase, and the bus handle is
/// bound to the owning plugin's id. All services are live by the time any
/// of these callbacks run.
pub struct ReadyContext {
    pub deps: ResolvedDeps,
    pub bus: PluginBusHandle,
}

/// Created during Register, consumed during Init and AfterPluginsReady,
/// never mutated in between
pub(crate) struct PendingInit {
    pub(crate) plugin_id: String,
    pub(crate) plugin_dir: Option<PathBuf>,
    pub(crate) deps: DepsSpec,
    pub(crate) schema: bool,
    pub(crate) init: Option<InitFn>,
    pub(crate) after_plugins_ready: Option<ReadyFn>,
}
