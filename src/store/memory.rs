//! In-memory store backend
//!
//! Per-schema key/value store with a migration ledger. Migrations are
//! "applied" by recording the filename per schema; re-running skips files
//! already in the ledger, matching the contract real backends follow.

use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::{schema_name, SchemaStore, StoreProvider};
use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

pub struct MemorySchemaStore {
    schema: String,
    values: RwLock<HashMap<String, String>>,
    applied_migrations: RwLock<Vec<String>>,
}

impl MemorySchemaStore {
    fn new(schema: String) -> Self {
        Self {
            schema,
            values: RwLock::new(HashMap::new()),
            applied_migrations: RwLock::new(Vec::new()),
        }
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap()
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }

    /// Migration filenames applied to this schema, in application order
    pub fn applied_migrations(&self) -> Vec<String> {
        self.applied_migrations.read().unwrap().clone()
    }

    fn is_applied(&self, file: &str) -> bool {
        self.applied_migrations
            .read()
            .unwrap()
            .iter()
            .any(|applied| applied == file)
    }

    fn record_applied(&self, file: String) {
        self.applied_migrations.write().unwrap().push(file);
    }
}

impl SchemaStore for MemorySchemaStore {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MemoryStoreProvider {
    stores: Mutex<HashMap<String, Arc<MemorySchemaStore>>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    async fn open_memory(&self, plugin_id: &str) -> Arc<MemorySchemaStore> {
        let schema = schema_name(plugin_id);
        let mut stores = self.stores.lock().await;
        Arc::clone(stores.entry(schema.clone()).or_insert_with(|| {
            log::debug!("Creating memory store for schema '{}'", schema);
            Arc::new(MemorySchemaStore::new(schema))
        }))
    }
}

impl Default for MemoryStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StoreProvider for MemoryStoreProvider {
    async fn open(&self, plugin_id: &str) -> StoreResult<Arc<dyn SchemaStore>> {
        Ok(self.open_memory(plugin_id).await)
    }

    async fn run_migrations(&self, plugin_id: &str, dir: &Path) -> StoreResult<()> {
        if !dir.exists() {
            log::trace!(
                "No migrations directory at '{}' for plugin '{}'",
                dir.display(),
                plugin_id
            );
            return Ok(());
        }

        let mut files = Vec::new();
        let mut entries =
            tokio::fs::read_dir(dir)
                .await
                .map_err(|e| StoreError::MigrationRead {
                    dir: dir.display().to_string(),
                    cause: e.to_string(),
                })?;
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| StoreError::MigrationRead {
                    dir: dir.display().to_string(),
                    cause: e.to_string(),
                })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();

        let store = self.open_memory(plugin_id).await;
        for file in files {
            if store.is_applied(&file) {
                log::trace!("Skipping applied migration '{}' for '{}'", file, store.schema());
                continue;
            }
            log::debug!("Applying migration '{}' to schema '{}'", file, store.schema());
            store.record_applied(file);
        }
        Ok(())
    }
}
