//! Plugin manifest discovery
//!
//! Two sources feed the Register phase: a workspace scan for
//! `<workspace>/<plugin>/plugin.toml` manifests, and a persisted table of
//! installed plugins. Workspace entries win on name collision, so a
//! locally checked-out plugin shadows its installed counterpart. Manually
//! injected plugins bypass discovery entirely and are handled by the
//! loader itself.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::types::{DiscoveredManifest, ManifestSource, PluginManifest};
use std::path::{Path, PathBuf};

/// Where discovery looks for plugins
///
/// Either path may be absent; discovery then simply skips that source.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Directory whose immediate subdirectories are scanned for
    /// `plugin.toml` manifests
    pub workspace: Option<PathBuf>,
    /// TOML table of installed plugins, maintained outside this crate
    pub installed_table: Option<PathBuf>,
}

impl DiscoveryConfig {
    /// No discovery at all; only injected plugins load
    pub fn none() -> Self {
        Self::default()
    }

    /// Platform default locations via the `dirs` crate
    ///
    /// The workspace falls back to `./plugins` when no user config
    /// directory exists.
    pub fn platform_defaults() -> Self {
        let base = dirs::config_dir()
            .map(|dir| dir.join("backplane"))
            .unwrap_or_else(|| PathBuf::from("./plugins"));
        Self {
            workspace: Some(base.join("workspace")),
            installed_table: Some(base.join("installed.toml")),
        }
    }
}

/// Shape of the installed-plugin table file
#[derive(serde::Deserialize)]
struct InstalledTable {
    #[serde(default)]
    plugins: Vec<InstalledEntry>,
}

#[derive(serde::Deserialize)]
struct InstalledEntry {
    /// Plugin directory; relative paths resolve against the table file
    dir: PathBuf,
    #[serde(flatten)]
    manifest: PluginManifest,
}

/// Discover manifests from both sources, workspace entries first
///
/// A malformed workspace manifest is logged and skipped so one broken
/// plugin cannot block the rest; a malformed installed table is an error,
/// since it is host configuration rather than plugin content.
pub(crate) async fn discover_manifests(
    config: &DiscoveryConfig,
) -> PluginResult<Vec<DiscoveredManifest>> {
    let mut discovered = Vec::new();

    if let Some(workspace) = &config.workspace {
        discovered.extend(scan_workspace(workspace).await?);
    }

    if let Some(table_path) = &config.installed_table {
        for entry in read_installed_table(table_path).await? {
            if let Some(local) = discovered
                .iter()
                .find(|d| d.manifest.name == entry.manifest.name)
            {
                log::debug!(
                    "Installed plugin '{}' shadowed by workspace entry at {}",
                    entry.manifest.name,
                    local.plugin_dir.display()
                );
                continue;
            }
            discovered.push(entry);
        }
    }

    log::debug!("Discovered {} plugin manifests", discovered.len());
    Ok(discovered)
}

async fn scan_workspace(workspace: &Path) -> PluginResult<Vec<DiscoveredManifest>> {
    let mut found = Vec::new();
    if !workspace.is_dir() {
        log::trace!(
            "Plugin workspace {} does not exist, skipping scan",
            workspace.display()
        );
        return Ok(found);
    }

    let pattern = workspace.join("*").join("plugin.toml");
    let pattern = pattern.to_str().ok_or_else(|| PluginError::DiscoveryError {
        message: format!("workspace path {} is not valid UTF-8", workspace.display()),
    })?;
    let paths = glob::glob(pattern).map_err(|e| PluginError::DiscoveryError {
        message: format!("invalid workspace glob pattern: {e}"),
    })?;

    for path in paths.flatten() {
        match parse_manifest(&path).await {
            Ok(manifest) => {
                let plugin_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                found.push(DiscoveredManifest {
                    manifest,
                    plugin_dir,
                    source: ManifestSource::Workspace,
                });
            }
            Err(error) => {
                log::warn!(
                    "Skipping unreadable plugin manifest {}: {}",
                    path.display(),
                    error
                );
            }
        }
    }

    Ok(found)
}

async fn parse_manifest(path: &Path) -> PluginResult<PluginManifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PluginError::DiscoveryError {
            message: e.to_string(),
        })?;
    toml::from_str(&content).map_err(|e| PluginError::DiscoveryError {
        message: e.to_string(),
    })
}

async fn read_installed_table(table_path: &Path) -> PluginResult<Vec<DiscoveredManifest>> {
    if !table_path.is_file() {
        log::trace!(
            "Installed plugin table {} does not exist, skipping",
            table_path.display()
        );
        return Ok(Vec::new());
    }

    let content =
        tokio::fs::read_to_string(table_path)
            .await
            .map_err(|e| PluginError::DiscoveryError {
                message: format!(
                    "failed to read installed plugin table {}: {}",
                    table_path.display(),
                    e
                ),
            })?;
    let table: InstalledTable =
        toml::from_str(&content).map_err(|e| PluginError::DiscoveryError {
            message: format!(
                "malformed installed plugin table {}: {}",
                table_path.display(),
                e
            ),
        })?;

    let base = table_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(table
        .plugins
        .into_iter()
        .map(|entry| {
            let plugin_dir = if entry.dir.is_absolute() {
                entry.dir
            } else {
                base.join(entry.dir)
            };
            DiscoveredManifest {
                manifest: entry.manifest,
                plugin_dir,
                source: ManifestSource::Installed,
            }
        })
        .collect())
}
