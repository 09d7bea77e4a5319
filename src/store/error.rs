//! Store Error Types

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read migrations from '{dir}': {cause}")]
    MigrationRead { dir: String, cause: String },

    #[error("Migration '{file}' failed for schema '{schema}': {cause}")]
    MigrationFailed {
        schema: String,
        file: String,
        cause: String,
    },

    #[error("Store operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
