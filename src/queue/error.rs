//! Queue Error Types

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{name}' already has a running consumer")]
    AlreadyStarted { name: String },

    #[error("Queue '{name}' is closed")]
    Closed { name: String },

    #[error("Failed to create queue '{name}': {cause}")]
    CreateFailed { name: String, cause: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
