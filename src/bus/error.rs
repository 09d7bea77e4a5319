//! Error types for the event bus

use std::fmt;

#[derive(Debug, Clone)]
pub enum BusError {
    /// A work-queue subscription for this namespace is already running
    WorkerGroupActive { namespace: String },

    /// The emit payload could not be serialized
    Serialize { hook_id: String, cause: String },

    /// One or more namespaces rejected the job; all were attempted first
    EnqueueFailed {
        hook_id: String,
        failures: Vec<(String, String)>,
    },

    /// The queue backend failed while setting up or tearing down a consumer
    QueueBackend { namespace: String, cause: String },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::WorkerGroupActive { namespace } => {
                write!(
                    f,
                    "Work-queue subscription '{namespace}' is still active; unsubscribe before re-subscribing"
                )
            }
            BusError::Serialize { hook_id, cause } => {
                write!(f, "Failed to serialize payload for hook '{hook_id}': {cause}")
            }
            BusError::EnqueueFailed { hook_id, failures } => {
                write!(
                    f,
                    "Failed to enqueue hook '{}' event into {} queues: {:?}",
                    hook_id,
                    failures.len(),
                    failures
                )
            }
            BusError::QueueBackend { namespace, cause } => {
                write!(f, "Queue backend error for '{namespace}': {cause}")
            }
        }
    }
}

impl std::error::Error for BusError {}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;
