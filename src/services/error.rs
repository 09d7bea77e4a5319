//! Service Registry Error Types

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service not found: '{service_id}' (requested by plugin '{plugin_id}')")]
    NotFound {
        service_id: String,
        plugin_id: String,
    },

    #[error("Service '{service_id}' is registered with a different type (expected {expected})")]
    TypeMismatch {
        service_id: String,
        expected: String,
    },

    #[error("Service factory for '{service_id}' failed: {message}")]
    FactoryFailed {
        service_id: String,
        message: String,
    },
}

/// Result type for service registry operations
pub type ServiceResult<T> = Result<T, ServiceError>;
