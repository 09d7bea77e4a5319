//! EventBus implementation

use crate::bus::error::{BusError, BusResult};
use crate::bus::hook::{DeliveryMode, Hook, SubscribeOptions};
use crate::queue::{JobHandler, Queue, QueueFactory, QueueJob, QueueOptions};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Error a listener may fail with; opaque to the bus
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

type ErasedListener =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), ListenerError>> + Send + Sync>;

struct BroadcastEntry {
    token: u64,
    plugin_id: String,
    listener: ErasedListener,
}

struct WorkQueueEntry {
    hook_id: String,
    queue: Arc<dyn Queue>,
}

/// Listener and queue tables, shared with subscription handles
struct BusTables {
    broadcast: Mutex<HashMap<String, Vec<BroadcastEntry>>>,
    work_queues: Mutex<HashMap<String, WorkQueueEntry>>,
}

pub struct EventBus {
    tables: Arc<BusTables>,
    queue_factory: Arc<dyn QueueFactory>,
    next_token: AtomicU64,
}

impl EventBus {
    pub fn new(queue_factory: Arc<dyn QueueFactory>) -> Self {
        Self {
            tables: Arc::new(BusTables {
                broadcast: Mutex::new(HashMap::new()),
                work_queues: Mutex::new(HashMap::new()),
            }),
            queue_factory,
            next_token: AtomicU64::new(1),
        }
    }

    /// Subscribe a listener on behalf of a plugin
    ///
    /// Broadcast subscriptions take effect immediately. Work-queue
    /// subscriptions create and start a queue consumer for the namespace
    /// `{plugin_id}:{hook_id}:{worker_group}`; subscribing while that
    /// namespace is still active is rejected, re-subscribing after
    /// `unsubscribe()` has completed is legal.
    pub async fn subscribe<T, F, Fut>(
        &self,
        plugin_id: &str,
        hook: Hook<T>,
        listener: F,
        options: SubscribeOptions,
    ) -> BusResult<Subscription>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let erased = erase_listener(listener);

        match options.mode {
            DeliveryMode::Broadcast => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                let mut broadcast = self.tables.broadcast.lock().unwrap();
                broadcast
                    .entry(hook.id().to_string())
                    .or_default()
                    .push(BroadcastEntry {
                        token,
                        plugin_id: plugin_id.to_string(),
                        listener: erased,
                    });
                log::trace!(
                    "Plugin '{}' broadcast-subscribed to hook '{}'",
                    plugin_id,
                    hook.id()
                );
                Ok(Subscription {
                    kind: SubscriptionKind::Broadcast {
                        hook_id: hook.id().to_string(),
                        token,
                        tables: Arc::clone(&self.tables),
                    },
                })
            }
            DeliveryMode::WorkQueue { worker_group } => {
                let namespace = format!("{}:{}:{}", plugin_id, hook.id(), worker_group);

                {
                    let work_queues = self.tables.work_queues.lock().unwrap();
                    if work_queues.contains_key(&namespace) {
                        return Err(BusError::WorkerGroupActive { namespace });
                    }
                }

                let queue = self
                    .queue_factory
                    .create(
                        &namespace,
                        QueueOptions {
                            max_retries: options.max_retries,
                        },
                    )
                    .await
                    .map_err(|e| BusError::QueueBackend {
                        namespace: namespace.clone(),
                        cause: e.to_string(),
                    })?;

                let handler: JobHandler = {
                    let erased = Arc::clone(&erased);
                    Arc::new(move |job: QueueJob| {
                        let erased = Arc::clone(&erased);
                        Box::pin(async move { erased(job.payload).await })
                    })
                };
                queue
                    .start(handler)
                    .await
                    .map_err(|e| BusError::QueueBackend {
                        namespace: namespace.clone(),
                        cause: e.to_string(),
                    })?;

                let conflict = {
                    let mut work_queues = self.tables.work_queues.lock().unwrap();
                    if work_queues.contains_key(&namespace) {
                        true
                    } else {
                        work_queues.insert(
                            namespace.clone(),
                            WorkQueueEntry {
                                hook_id: hook.id().to_string(),
                                queue: Arc::clone(&queue),
                            },
                        );
                        false
                    }
                };
                if conflict {
                    let _ = queue.stop().await;
                    return Err(BusError::WorkerGroupActive { namespace });
                }

                log::debug!(
                    "Plugin '{}' work-queue-subscribed to hook '{}' (namespace '{}')",
                    plugin_id,
                    hook.id(),
                    namespace
                );
                Ok(Subscription {
                    kind: SubscriptionKind::WorkQueue {
                        namespace,
                        tables: Arc::clone(&self.tables),
                    },
                })
            }
        }
    }

    /// Emit an event to every subscription of the hook
    ///
    /// Broadcast listeners run sequentially; a listener error is logged and
    /// never propagated, so later listeners still run. One job is then
    /// enqueued per registered work-queue namespace; enqueue failures are
    /// collected after attempting every namespace.
    pub async fn emit<T: Serialize>(&self, hook: Hook<T>, payload: &T) -> BusResult<()> {
        let serialized =
            serde_json::to_string(payload).map_err(|e| BusError::Serialize {
                hook_id: hook.id().to_string(),
                cause: e.to_string(),
            })?;

        let listeners: Vec<(String, ErasedListener)> = {
            let broadcast = self.tables.broadcast.lock().unwrap();
            broadcast
                .get(hook.id())
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| (e.plugin_id.clone(), Arc::clone(&e.listener)))
                        .collect()
                })
                .unwrap_or_default()
        };
        for (plugin_id, listener) in listeners {
            if let Err(error) = listener(serialized.clone()).await {
                log::error!(
                    "Broadcast listener of plugin '{}' failed on hook '{}': {}",
                    plugin_id,
                    hook.id(),
                    error
                );
            }
        }

        let queues: Vec<(String, Arc<dyn Queue>)> = {
            let work_queues = self.tables.work_queues.lock().unwrap();
            work_queues
                .iter()
                .filter(|(_, entry)| entry.hook_id == hook.id())
                .map(|(namespace, entry)| (namespace.clone(), Arc::clone(&entry.queue)))
                .collect()
        };
        let mut failures = Vec::new();
        for (namespace, queue) in queues {
            if let Err(error) = queue.enqueue(QueueJob::new(serialized.clone())).await {
                failures.push((namespace, error.to_string()));
            }
        }
        if !failures.is_empty() {
            return Err(BusError::EnqueueFailed {
                hook_id: hook.id().to_string(),
                failures,
            });
        }
        Ok(())
    }

    /// Number of broadcast listeners currently registered for a hook id
    pub fn broadcast_listener_count(&self, hook_id: &str) -> usize {
        self.tables
            .broadcast
            .lock()
            .unwrap()
            .get(hook_id)
            .map_or(0, Vec::len)
    }

    /// Whether a work-queue namespace currently has a running consumer
    pub fn has_work_queue(&self, namespace: &str) -> bool {
        self.tables
            .work_queues
            .lock()
            .unwrap()
            .contains_key(namespace)
    }

    /// Stop all queue consumers and drop all subscriptions
    pub async fn shutdown(&self) -> BusResult<()> {
        let queues: Vec<(String, Arc<dyn Queue>)> = {
            let mut work_queues = self.tables.work_queues.lock().unwrap();
            work_queues
                .drain()
                .map(|(namespace, entry)| (namespace, entry.queue))
                .collect()
        };
        for (namespace, queue) in queues {
            if let Err(error) = queue.stop().await {
                log::warn!(
                    "Failed to stop queue consumer '{}' during shutdown: {}",
                    namespace,
                    error
                );
            }
        }
        self.tables.broadcast.lock().unwrap().clear();
        log::info!("Event bus shutdown complete");
        Ok(())
    }
}

fn erase_listener<T, F, Fut>(listener: F) -> ErasedListener
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    let listener = Arc::new(listener);
    Arc::new(move |payload: String| {
        let listener = Arc::clone(&listener);
        Box::pin(async move {
            let value: T =
                serde_json::from_str(&payload).map_err(|e| -> ListenerError { Box::new(e) })?;
            listener(value).await
        })
    })
}

enum SubscriptionKind {
    Broadcast {
        hook_id: String,
        token: u64,
        tables: Arc<BusTables>,
    },
    WorkQueue {
        namespace: String,
        tables: Arc<BusTables>,
    },
}

/// Handle returned by `subscribe`; consuming it is the only way to remove
/// the subscription short of a full bus shutdown
pub struct Subscription {
    kind: SubscriptionKind,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            SubscriptionKind::Broadcast { .. } => "Broadcast",
            SubscriptionKind::WorkQueue { .. } => "WorkQueue",
        };
        f.debug_struct("Subscription").field("kind", &kind).finish()
    }
}

impl Subscription {
    pub async fn unsubscribe(self) -> BusResult<()> {
        match self.kind {
            SubscriptionKind::Broadcast {
                hook_id,
                token,
                tables,
            } => {
                let mut broadcast = tables.broadcast.lock().unwrap();
                if let Some(entries) = broadcast.get_mut(&hook_id) {
                    entries.retain(|entry| entry.token != token);
                    if entries.is_empty() {
                        broadcast.remove(&hook_id);
                    }
                }
                Ok(())
            }
            SubscriptionKind::WorkQueue { namespace, tables } => {
                let entry = tables.work_queues.lock().unwrap().remove(&namespace);
                if let Some(entry) = entry {
                    entry
                        .queue
                        .stop()
                        .await
                        .map_err(|e| BusError::QueueBackend {
                            namespace,
                            cause: e.to_string(),
                        })?;
                }
                Ok(())
            }
        }
    }
}
