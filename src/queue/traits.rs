//! Queue trait definitions
//!
//! The contract between the event bus and whatever backend stores and
//! delivers work-queue jobs.

use crate::queue::error::QueueResult;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A single unit of work: the serialized event payload
#[derive(Debug, Clone, PartialEq)]
pub struct QueueJob {
    pub payload: String,
}

impl QueueJob {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Error a job handler may fail with; opaque to the queue
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Async job handler installed by `Queue::start`
pub type JobHandler =
    Arc<dyn Fn(QueueJob) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Options applied when a queue is created
#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    /// How many times a failed job is retried before being dropped
    pub max_retries: u32,
}

/// A named job queue with exactly-one-consumer delivery
///
/// Jobs may be enqueued before `start` is called; they are held and
/// delivered once a consumer is running. `start` may be called at most once
/// per queue instance. `stop` is graceful (the in-flight job finishes) and
/// idempotent.
#[async_trait::async_trait]
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    async fn enqueue(&self, job: QueueJob) -> QueueResult<()>;

    async fn start(&self, handler: JobHandler) -> QueueResult<()>;

    async fn stop(&self) -> QueueResult<()>;
}

/// Creates queues by name
///
/// The bus calls `create` once per work-queue subscription namespace.
/// Whether two `create` calls with the same name share underlying storage
/// is a backend property: persistent backends reattach to the named queue,
/// the in-memory backend hands out a fresh empty queue each time.
#[async_trait::async_trait]
pub trait QueueFactory: Send + Sync {
    async fn create(&self, name: &str, options: QueueOptions) -> QueueResult<Arc<dyn Queue>>;
}
