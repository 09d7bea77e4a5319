//! Service Registry
//!
//! Identity-keyed store of service implementations shared between plugins.
//! Services are resolved either as process-wide singletons or through
//! per-consumer factories (e.g. a database connection scoped to the
//! requesting plugin). One registry instance exists per runtime boot, owned
//! by the plugin loader and threaded explicitly into every plugin.

mod error;
mod registry;

pub use error::{ServiceError, ServiceResult};
pub use registry::{ServiceRef, ServiceRegistry};
