//! Type definitions for the plugin runtime
//!
//! Core data structures for manifests, permissions, and load reporting.

use std::path::PathBuf;

/// Plugin manifest metadata, parsed from `plugin.toml`
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub api_version: u32,
}

/// Where a discovered manifest came from
///
/// Workspace entries win over installed-table entries on name collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    Workspace,
    Installed,
}

/// A manifest found during discovery, with the directory it lives in
#[derive(Debug, Clone)]
pub struct DiscoveredManifest {
    pub manifest: PluginManifest,
    pub plugin_dir: PathBuf,
    pub source: ManifestSource,
}

/// A permission a plugin asks to have recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Permission {
    pub id: String,
    pub description: Option<String>,
}

impl Permission {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A recorded permission, namespaced by its owning plugin
///
/// `permission_id` is `"{plugin_id}.{raw_id}"` so two plugins registering
/// the same raw id never collide.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredPermission {
    pub plugin_id: String,
    pub permission_id: String,
    pub description: Option<String>,
}

/// Lifecycle phase a plugin failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Register,
    Init,
    AfterPluginsReady,
}

#[derive(Debug, Clone)]
pub struct PluginFailure {
    pub plugin_id: String,
    pub phase: LoadPhase,
    pub error: String,
}

/// Outcome of a full three-phase load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Plugins whose init completed, in initialization order
    pub initialized: Vec<String>,
    /// Plugins skipped before register (incompatible or unresolvable)
    pub skipped: Vec<String>,
    /// Per-plugin failures with the phase they happened in
    pub failures: Vec<PluginFailure>,
}

impl LoadReport {
    pub fn failure_of(&self, plugin_id: &str) -> Option<&PluginFailure> {
        self.failures.iter().find(|f| f.plugin_id == plugin_id)
    }

    pub fn is_initialized(&self, plugin_id: &str) -> bool {
        self.initialized.iter().any(|id| id == plugin_id)
    }
}
