//! Work Queue Contract
//!
//! The `Queue`/`QueueFactory` contract that persistent queue backends must
//! satisfy, plus the in-memory reference backend used as the default and by
//! the test suite. The event bus obtains one queue per work-queue
//! subscription namespace through an injected factory; real backends
//! (Redis, database-backed, etc.) live outside this crate and only need to
//! implement the two traits here.
//!
//! A queue delivers each job to exactly one handler invocation, retrying a
//! failed job up to the `max_retries` configured at creation time. The
//! backend owns its own concurrency model; the bus imposes no additional
//! serialization on top.

mod error;
mod memory;
mod traits;

pub use error::{QueueError, QueueResult};
pub use memory::{MemoryQueue, MemoryQueueFactory};
pub use traits::{HandlerError, JobHandler, Queue, QueueFactory, QueueJob, QueueOptions};
