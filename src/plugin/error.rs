//! Plugin Error Handling
//!
//! Error types for plugin loading, dependency resolution, and the three
//! lifecycle phases. Only a circular dependency is fatal to a load; every
//! other failure is recorded per plugin and loading continues.

use std::fmt;

/// Result type alias for plugin operations
pub type PluginResult<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Clone, PartialEq)]
pub enum PluginError {
    /// The dependency graph contains a cycle; loading must abort
    CircularDependency { remaining: Vec<String> },

    /// Plugin module could not be resolved or loaded
    LoadError { plugin_name: String, cause: String },

    /// Plugin API version incompatible with the runtime
    VersionIncompatible { message: String },

    /// A declared dependency could not be resolved
    DependencyError { plugin_id: String, cause: String },

    /// A lifecycle operation failed
    ExecutionError {
        plugin_id: String,
        operation: String,
        cause: String,
    },

    /// Plugin discovery failed
    DiscoveryError { message: String },

    /// Generic plugin error
    Generic { message: String },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::CircularDependency { remaining } => {
                write!(
                    f,
                    "Circular dependency detected among plugins: {}",
                    remaining.join(", ")
                )
            }
            PluginError::LoadError { plugin_name, cause } => {
                write!(f, "Failed to load plugin '{}': {}", plugin_name, cause)
            }
            PluginError::VersionIncompatible { message } => {
                write!(f, "Version incompatible: {}", message)
            }
            PluginError::DependencyError { plugin_id, cause } => {
                write!(
                    f,
                    "Failed to resolve dependencies for plugin '{}': {}",
                    plugin_id, cause
                )
            }
            PluginError::ExecutionError {
                plugin_id,
                operation,
                cause,
            } => {
                write!(
                    f,
                    "Plugin '{}' failed during '{}': {}",
                    plugin_id, operation, cause
                )
            }
            PluginError::DiscoveryError { message } => {
                write!(f, "Plugin discovery failed: {}", message)
            }
            PluginError::Generic { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for PluginError {}
