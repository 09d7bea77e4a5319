//! Extension Point Error Types

#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Extension point '{point_id}' is registered with a different type (expected {expected})")]
    TypeMismatch {
        point_id: String,
        expected: String,
    },
}

/// Result type for extension point operations
pub type ExtensionResult<T> = Result<T, ExtensionError>;
