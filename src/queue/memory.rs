//! In-memory queue backend
//!
//! Reference implementation of the `Queue`/`QueueFactory` contract backed
//! by an unbounded channel and a single worker task. Jobs enqueued before
//! `start` wait in the channel; a failed job is retried in place up to
//! `max_retries` before being dropped with a logged error.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::{JobHandler, Queue, QueueFactory, QueueJob, QueueOptions};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

struct WorkerState {
    receiver: Option<mpsc::UnboundedReceiver<QueueJob>>,
    worker: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
}

pub struct MemoryQueue {
    name: String,
    options: QueueOptions,
    sender: mpsc::UnboundedSender<QueueJob>,
    state: Mutex<WorkerState>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>, options: QueueOptions) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            options,
            sender,
            state: Mutex::new(WorkerState {
                receiver: Some(receiver),
                worker: None,
                stop_tx: None,
            }),
        }
    }
}

#[async_trait::async_trait]
impl Queue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, job: QueueJob) -> QueueResult<()> {
        self.sender.send(job).map_err(|_| QueueError::Closed {
            name: self.name.clone(),
        })
    }

    async fn start(&self, handler: JobHandler) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let receiver = state
            .receiver
            .take()
            .ok_or_else(|| QueueError::AlreadyStarted {
                name: self.name.clone(),
            })?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = tokio::spawn(worker_loop(
            self.name.clone(),
            receiver,
            stop_rx,
            handler,
            self.options.max_retries,
        ));

        state.worker = Some(worker);
        state.stop_tx = Some(stop_tx);
        log::debug!("Queue '{}' consumer started", self.name);
        Ok(())
    }

    async fn stop(&self) -> QueueResult<()> {
        let (stop_tx, worker) = {
            let mut state = self.state.lock().await;
            (state.stop_tx.take(), state.worker.take())
        };

        if let Some(stop_tx) = stop_tx {
            let _ = stop_tx.send(true);
        }
        if let Some(worker) = worker {
            // The worker finishes its in-flight job before exiting
            let _ = worker.await;
            log::debug!("Queue '{}' consumer stopped", self.name);
        }
        Ok(())
    }
}

async fn worker_loop(
    name: String,
    mut receiver: mpsc::UnboundedReceiver<QueueJob>,
    mut stop_rx: watch::Receiver<bool>,
    handler: JobHandler,
    max_retries: u32,
) {
    loop {
        let job = tokio::select! {
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
            _ = stop_rx.changed() => break,
        };
        process_job(&name, job, &handler, max_retries).await;
    }
}

async fn process_job(queue: &str, job: QueueJob, handler: &JobHandler, max_retries: u32) {
    let mut attempt = 0u32;
    loop {
        match handler(job.clone()).await {
            Ok(()) => return,
            Err(error) => {
                if attempt >= max_retries {
                    log::error!(
                        "Queue '{}' dropping job after {} failed attempts: {}",
                        queue,
                        attempt + 1,
                        error
                    );
                    return;
                }
                attempt += 1;
                log::warn!(
                    "Queue '{}' job failed (attempt {}), retrying: {}",
                    queue,
                    attempt,
                    error
                );
            }
        }
    }
}

/// Factory handing out fresh in-memory queues
///
/// Each `create` call returns a new empty queue. Jobs do not survive across
/// subscriptions with this backend; that durability is a property of real
/// persistent backends, not the memory one.
pub struct MemoryQueueFactory;

impl MemoryQueueFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MemoryQueueFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QueueFactory for MemoryQueueFactory {
    async fn create(&self, name: &str, options: QueueOptions) -> QueueResult<Arc<dyn Queue>> {
        log::trace!(
            "Creating memory queue '{}' (max_retries: {})",
            name,
            options.max_retries
        );
        Ok(Arc::new(MemoryQueue::new(name, options)))
    }
}
