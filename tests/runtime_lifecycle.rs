//! End-to-end plugin runtime tests
//!
//! Boots a loader through the public API with a small constellation of
//! plugins and checks the wiring between services, permissions, and the
//! two event delivery modes.

use backplane::bus::{Hook, SubscribeOptions};
use backplane::plugin::{
    BackendPlugin, DepsSpec, DiscoveryConfig, InitSpec, Permission, PluginCatalog, PluginError,
    PluginLoader, PluginResult, RegisterContext,
};
use backplane::services::ServiceRef;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const SMTP_URL: ServiceRef<Arc<String>> = ServiceRef::new("config.smtpUrl");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportReady {
    id: u32,
}

const REPORT_READY: Hook<ReportReady> = Hook::new("reports.ready");

/// Provides the SMTP endpoint and declares the permission to use it
struct ConfigPlugin;

#[async_trait::async_trait]
impl BackendPlugin for ConfigPlugin {
    fn plugin_id(&self) -> &str {
        "config"
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        ctx.register_service(SMTP_URL, Arc::new("smtp://localhost:2525".to_string()));
        ctx.register_permissions(&[Permission::new("send")]);
        ctx.register_init(InitSpec::new(DepsSpec::new(), |_deps| async move { Ok(()) }))
    }
}

/// Consumes the endpoint and drains report events from a worker queue
struct MailerPlugin {
    delivered: mpsc::UnboundedSender<(u32, String)>,
}

#[async_trait::async_trait]
impl BackendPlugin for MailerPlugin {
    fn plugin_id(&self) -> &str {
        "mailer"
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        let delivered = self.delivered.clone();
        ctx.register_init(
            InitSpec::new(DepsSpec::new().with("smtp", SMTP_URL), |_deps| async move {
                Ok(())
            })
            .with_after_plugins_ready(move |ctx| async move {
                let smtp: Arc<String> = ctx.deps.get("smtp")?;
                ctx.bus
                    .on_hook(
                        REPORT_READY,
                        move |event: ReportReady| {
                            let delivered = delivered.clone();
                            let smtp = Arc::clone(&smtp);
                            async move {
                                delivered.send((event.id, smtp.to_string())).ok();
                                Ok(())
                            }
                        },
                        SubscribeOptions::work_queue("senders").with_max_retries(2),
                    )
                    .await
                    .map_err(|e| PluginError::Generic {
                        message: e.to_string(),
                    })?;
                Ok(())
            }),
        )
    }
}

/// Emits a report event once every plugin is ready
struct ReportsPlugin;

#[async_trait::async_trait]
impl BackendPlugin for ReportsPlugin {
    fn plugin_id(&self) -> &str {
        "reports"
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        ctx.register_init(
            InitSpec::new(DepsSpec::new(), |_deps| async move { Ok(()) })
                .with_after_plugins_ready(|ctx| async move {
                    ctx.bus
                        .emit_hook(REPORT_READY, &ReportReady { id: 42 })
                        .await
                        .map_err(|e| PluginError::Generic {
                            message: e.to_string(),
                        })?;
                    Ok(())
                }),
        )
    }
}

#[tokio::test]
async fn test_full_boot_wires_services_permissions_and_queues() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut loader = PluginLoader::new();
    // Mailer registered first even though it initializes after config
    loader.inject_plugin(Arc::new(MailerPlugin { delivered: tx }));
    loader.inject_plugin(Arc::new(ConfigPlugin));
    loader.inject_plugin(Arc::new(ReportsPlugin));

    let report = loader.load().await.unwrap();

    assert_eq!(report.initialized, vec!["config", "mailer", "reports"]);
    assert!(report.failures.is_empty());
    assert!(loader
        .registered_permissions()
        .iter()
        .any(|p| p.permission_id == "config.send"));

    let (id, smtp) = rx.recv().await.unwrap();
    assert_eq!(id, 42);
    assert_eq!(smtp, "smtp://localhost:2525");
    assert!(rx.try_recv().is_err());

    loader.shutdown().await;
}

struct BroadcastProbe {
    id: &'static str,
    seen: Arc<Mutex<Vec<(String, i32)>>>,
    fail: bool,
}

#[async_trait::async_trait]
impl BackendPlugin for BroadcastProbe {
    fn plugin_id(&self) -> &str {
        self.id
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        let seen = Arc::clone(&self.seen);
        let id = self.id;
        let fail = self.fail;
        ctx.register_init(
            InitSpec::new(DepsSpec::new(), |_deps| async move { Ok(()) })
                .with_after_plugins_ready(move |ctx| async move {
                    ctx.bus
                        .on_hook(
                            VALUE_HOOK,
                            move |event: Value| {
                                let seen = Arc::clone(&seen);
                                async move {
                                    seen.lock().unwrap().push((id.to_string(), event.value));
                                    if fail {
                                        return Err("listener exploded".into());
                                    }
                                    Ok(())
                                }
                            },
                            SubscribeOptions::broadcast(),
                        )
                        .await
                        .map_err(|e| PluginError::Generic {
                            message: e.to_string(),
                        })?;
                    Ok(())
                }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Value {
    value: i32,
}

const VALUE_HOOK: Hook<Value> = Hook::new("test.hook");

#[tokio::test]
async fn test_broadcast_reaches_every_plugin_despite_a_failing_listener() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut loader = PluginLoader::new();
    loader.inject_plugin(Arc::new(BroadcastProbe {
        id: "p1",
        seen: Arc::clone(&seen),
        fail: true,
    }));
    loader.inject_plugin(Arc::new(BroadcastProbe {
        id: "p2",
        seen: Arc::clone(&seen),
        fail: false,
    }));

    loader.load().await.unwrap();

    loader
        .bus()
        .emit(VALUE_HOOK, &Value { value: 1 })
        .await
        .unwrap();

    let mut received = seen.lock().unwrap().clone();
    received.sort();
    assert_eq!(
        received,
        vec![("p1".to_string(), 1), ("p2".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_discovered_workspace_plugin_boots() {
    let workspace = tempfile::tempdir().unwrap();
    let plugin_dir = workspace.path().join("config");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("plugin.toml"),
        format!(
            "name = \"config\"\nversion = \"0.1.0\"\ndescription = \"configuration provider\"\napi_version = {}\n",
            backplane::get_plugin_api_version()
        ),
    )
    .unwrap();

    let mut catalog = PluginCatalog::new();
    catalog.insert("config", || Arc::new(ConfigPlugin));

    let mut loader = PluginLoader::new()
        .with_catalog(catalog)
        .with_discovery(DiscoveryConfig {
            workspace: Some(workspace.path().to_path_buf()),
            installed_table: None,
        });

    let report = loader.load().await.unwrap();

    assert_eq!(report.initialized, vec!["config"]);
    let smtp = loader
        .services()
        .get(SMTP_URL, "test-harness")
        .await
        .unwrap();
    assert_eq!(*smtp, "smtp://localhost:2525");
}
