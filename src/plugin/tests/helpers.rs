//! Shared mock plugins for loader tests

use crate::plugin::context::RegisterContext;
use crate::plugin::deps::DepsSpec;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::initialization::InitSpec;
use crate::plugin::traits::BackendPlugin;
use crate::services::ServiceRef;
use std::sync::{Arc, Mutex};

/// Ordered record of observable side effects across a whole load
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn record(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub(crate) fn position(entries: &[String], needle: &str) -> usize {
    entries
        .iter()
        .position(|e| e == needle)
        .unwrap_or_else(|| panic!("'{needle}' missing from {entries:?}"))
}

pub(crate) const GREETING: ServiceRef<Arc<String>> = ServiceRef::new("test.greeting");

/// Provides the greeting service and records its init
pub(crate) struct GreetingProvider {
    pub id: &'static str,
    pub journal: Journal,
}

#[async_trait::async_trait]
impl BackendPlugin for GreetingProvider {
    fn plugin_id(&self) -> &str {
        self.id
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        ctx.register_service(GREETING, Arc::new("hello".to_string()));
        let journal = Arc::clone(&self.journal);
        let id = self.id;
        ctx.register_init(InitSpec::new(DepsSpec::new(), move |_deps| async move {
            record(&journal, format!("{id}.init"));
            Ok(())
        }))
    }
}

/// Depends on the greeting service; records what it resolved
pub(crate) struct GreetingConsumer {
    pub id: &'static str,
    pub journal: Journal,
    pub fail_init: bool,
}

#[async_trait::async_trait]
impl BackendPlugin for GreetingConsumer {
    fn plugin_id(&self) -> &str {
        self.id
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        let journal = Arc::clone(&self.journal);
        let id = self.id;
        let fail = self.fail_init;
        ctx.register_init(InitSpec::new(
            DepsSpec::new().with("greeting", GREETING),
            move |deps| async move {
                if fail {
                    return Err(PluginError::Generic {
                        message: format!("{id} was told to fail"),
                    });
                }
                let greeting: Arc<String> = deps.get("greeting")?;
                record(&journal, format!("{id}.init:{greeting}"));
                Ok(())
            },
        ))
    }
}

/// No services, no dependencies, just an init marker
pub(crate) struct NoopPlugin {
    pub id: &'static str,
    pub journal: Journal,
}

#[async_trait::async_trait]
impl BackendPlugin for NoopPlugin {
    fn plugin_id(&self) -> &str {
        self.id
    }

    async fn register(&self, ctx: &mut RegisterContext<'_>) -> PluginResult<()> {
        let journal = Arc::clone(&self.journal);
        let id = self.id;
        ctx.register_init(InitSpec::new(DepsSpec::new(), move |_deps| async move {
            record(&journal, format!("{id}.init"));
            Ok(())
        }))
    }
}
