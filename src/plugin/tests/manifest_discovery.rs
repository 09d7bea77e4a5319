//! Manifest discovery and catalog resolution tests
//!
//! Drives the loader from real manifest files in temp directories:
//! workspace scanning, installed-table merging, version compatibility,
//! and the failure modes that must not stop a load.

use super::helpers::*;
use crate::plugin::context::RegisterContext;
use crate::plugin::deps::DepsSpec;
use crate::plugin::discovery::DiscoveryConfig;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::initialization::InitSpec;
use crate::plugin::loader::PluginLoader;
use crate::plugin::traits::{BackendPlugin, PluginCatalog};
use std::path::Path;
use std::sync::Arc;

fn write_manifest(dir: &Path, name: &str, api_version: u32) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("plugin.toml"),
        format!(
            "name = \"{name}\"\nversion = \"0.1.0\"\ndescription = \"test fixture\"\napi_version = {api_version}\n"
        ),
    )
    .unwrap();
}

fn catalog_with_noop(journal: &Journal, names: &[&'static str]) -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    for &name in names {
        let journal = Arc::clone(journal);
        catalog.insert(name, move || {
            Arc::new(NoopPlugin {
                id: name,
                journal: Arc::clone(&journal),
            })
        });
    }
    catalog
}

/// Records the directory its manifest was discovered in
struct DirProbe {
    id: &'static str,
    journal: Journal,
}

#[async_trait::async_trait]
impl BackendPlugin for DirProbe {
    fn plugin_id(&self) -> &str {
        self.id
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        let dir = ctx
            .plugin_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        record(&self.journal, format!("{}.dir:{}", self.id, dir));
        let journal = Arc::clone(&self.journal);
        let id = self.id;
        ctx.register_init(InitSpec::new(DepsSpec::new(), move |_deps| async move {
            record(&journal, format!("{id}.init"));
            Ok(())
        }))
    }
}

#[tokio::test]
async fn test_workspace_manifests_resolve_through_the_catalog() {
    let workspace = tempfile::tempdir().unwrap();
    let api = crate::get_plugin_api_version();
    write_manifest(&workspace.path().join("alpha"), "alpha", api);
    write_manifest(&workspace.path().join("beta"), "beta", api);

    let journal = journal();
    let mut loader = PluginLoader::new()
        .with_catalog(catalog_with_noop(&journal, &["alpha", "beta"]))
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: None,
        });

    let report = loader.load().await.unwrap();

    assert!(report.is_initialized("alpha"));
    assert!(report.is_initialized("beta"));
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_workspace_entry_shadows_the_installed_table() {
    let workspace = tempfile::tempdir().unwrap();
    let api = crate::get_plugin_api_version();
    write_manifest(&workspace.path().join("alpha"), "alpha", api);

    let install_root = tempfile::tempdir().unwrap();
    std::fs::write(
        install_root.path().join("installed.toml"),
        format!(
            "[[plugins]]\ndir = \"alpha-install\"\nname = \"alpha\"\nversion = \"0.9.0\"\ndescription = \"installed copy\"\napi_version = {api}\n"
        ),
    )
    .unwrap();

    let journal = journal();
    let mut catalog = PluginCatalog::new();
    {
        let journal = Arc::clone(&journal);
        catalog.insert("alpha", move || {
            Arc::new(DirProbe {
                id: "alpha",
                journal: Arc::clone(&journal),
            })
        });
    }
    let mut loader = PluginLoader::new()
        .with_catalog(catalog)
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: Some(install_root.path().join("installed.toml")),
        });

    let report = loader.load().await.unwrap();

    assert_eq!(report.initialized, vec!["alpha"]);
    let expected_dir = workspace.path().join("alpha").display().to_string();
    assert_eq!(
        entries(&journal),
        vec![format!("alpha.dir:{expected_dir}"), "alpha.init".to_string()]
    );
}

#[tokio::test]
async fn test_manifest_without_a_constructor_is_skipped() {
    let workspace = tempfile::tempdir().unwrap();
    let api = crate::get_plugin_api_version();
    write_manifest(&workspace.path().join("ghost"), "ghost", api);
    write_manifest(&workspace.path().join("alpha"), "alpha", api);

    let journal = journal();
    let mut loader = PluginLoader::new()
        .with_catalog(catalog_with_noop(&journal, &["alpha"]))
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: None,
        });

    let report = loader.load().await.unwrap();

    assert!(report.skipped.contains(&"ghost".to_string()));
    assert!(report.is_initialized("alpha"));
}

#[tokio::test]
async fn test_incompatible_api_version_is_skipped() {
    let workspace = tempfile::tempdir().unwrap();
    write_manifest(&workspace.path().join("old-timer"), "old-timer", 19990101);

    let journal = journal();
    let mut loader = PluginLoader::new()
        .with_catalog(catalog_with_noop(&journal, &["old-timer"]))
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: None,
        });

    let report = loader.load().await.unwrap();

    assert_eq!(report.skipped, vec!["old-timer"]);
    assert!(report.initialized.is_empty());
    assert!(entries(&journal).is_empty());
}

#[tokio::test]
async fn test_malformed_manifest_does_not_stop_the_load() {
    let workspace = tempfile::tempdir().unwrap();
    let api = crate::get_plugin_api_version();
    let broken = workspace.path().join("broken");
    std::fs::create_dir_all(&broken).unwrap();
    std::fs::write(broken.join("plugin.toml"), "name = [not valid").unwrap();
    write_manifest(&workspace.path().join("alpha"), "alpha", api);

    let journal = journal();
    let mut loader = PluginLoader::new()
        .with_catalog(catalog_with_noop(&journal, &["alpha"]))
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: None,
        });

    let report = loader.load().await.unwrap();

    assert_eq!(report.initialized, vec!["alpha"]);
}

#[tokio::test]
async fn test_installed_table_resolves_relative_dirs() {
    let install_root = tempfile::tempdir().unwrap();
    let api = crate::get_plugin_api_version();
    std::fs::write(
        install_root.path().join("installed.toml"),
        format!(
            "[[plugins]]\ndir = \"vendored/gamma\"\nname = \"gamma\"\nversion = \"1.0.0\"\ndescription = \"installed fixture\"\napi_version = {api}\n"
        ),
    )
    .unwrap();

    let journal = journal();
    let mut catalog = PluginCatalog::new();
    {
        let journal = Arc::clone(&journal);
        catalog.insert("gamma", move || {
            Arc::new(DirProbe {
                id: "gamma",
                journal: Arc::clone(&journal),
            })
        });
    }
    let mut loader = PluginLoader::new()
        .with_catalog(catalog)
        .with_discovery(DiscoveryConfig {
            workspace: None,
            installed_table: Some(install_root.path().join("installed.toml")),
        });

    loader.load().await.unwrap();

    let expected_dir = install_root
        .path()
        .join("vendored/gamma")
        .display()
        .to_string();
    assert_eq!(
        entries(&journal),
        vec![format!("gamma.dir:{expected_dir}"), "gamma.init".to_string()]
    );
}

#[tokio::test]
async fn test_malformed_installed_table_is_a_discovery_error() {
    let install_root = tempfile::tempdir().unwrap();
    std::fs::write(install_root.path().join("installed.toml"), "plugins = 3").unwrap();

    let mut loader = PluginLoader::new().with_discovery(DiscoveryConfig {
        workspace: None,
        installed_table: Some(install_root.path().join("installed.toml")),
    });

    match loader.load().await.unwrap_err() {
        PluginError::DiscoveryError { message } => {
            assert!(message.contains("installed.toml"));
        }
        other => panic!("Expected DiscoveryError, got {other}"),
    }
}
