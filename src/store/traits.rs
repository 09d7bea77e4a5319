//! Store trait definitions

use crate::store::error::StoreResult;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

/// Schema namespace for a plugin's tables
pub fn schema_name(plugin_id: &str) -> String {
    format!("plugin_{plugin_id}")
}

/// Opens schema-scoped store handles and applies plugin migrations
#[async_trait::async_trait]
pub trait StoreProvider: Send + Sync {
    /// Open (creating or reattaching to) the store for a plugin
    ///
    /// Handles are memoized per plugin id; two `open` calls for the same
    /// plugin return the same underlying store.
    async fn open(&self, plugin_id: &str) -> StoreResult<Arc<dyn SchemaStore>>;

    /// Apply the plugin's migrations from a directory of `*.sql` files
    ///
    /// Files are applied in sorted filename order; already-applied files
    /// are skipped on a re-run. A missing directory is not an error.
    async fn run_migrations(&self, plugin_id: &str, dir: &Path) -> StoreResult<()>;
}

/// A store handle scoped to one plugin's schema
///
/// Backend-specific surfaces (query builders, pooled connections) are
/// reached by downcasting through `as_any`.
pub trait SchemaStore: Send + Sync {
    fn schema(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}
