//! Hook identifiers and subscription options

use std::marker::PhantomData;

/// Typed token identifying an event topic
///
/// The id is a plain string (e.g. `"core.permissionsRegistered"`); the type
/// parameter pins the payload type on both the emit and subscribe side.
/// Payload validation beyond serde is the collaborator's business.
pub struct Hook<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Hook<T> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hook<T> {}

impl<T> std::fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hook({})", self.id)
    }
}

/// How events reach a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryMode {
    /// Every subscriber receives every event
    Broadcast,
    /// Subscribers in the named group compete for jobs on a backing queue
    WorkQueue { worker_group: String },
}

/// Options accepted by `EventBus::subscribe`
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    pub mode: DeliveryMode,
    /// Retry count handed to the queue backend; ignored for broadcast
    pub max_retries: u32,
}

impl SubscribeOptions {
    pub fn broadcast() -> Self {
        Self {
            mode: DeliveryMode::Broadcast,
            max_retries: 0,
        }
    }

    pub fn work_queue(worker_group: impl Into<String>) -> Self {
        Self {
            mode: DeliveryMode::WorkQueue {
                worker_group: worker_group.into(),
            },
            max_retries: 0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::broadcast()
    }
}
