//! Schema-Scoped Persistence Boundary
//!
//! Each plugin's persistence lives in its own schema namespace,
//! `plugin_<plugin_id>`, isolating one plugin's tables from all others.
//! The core only needs two things from a backend: "give me a store handle
//! scoped to this plugin id" and "run these migrations if they exist".
//! Everything beyond that (connection pooling, SQL dialects, value types)
//! is collaborator territory reached through `as_any` downcasting.
//!
//! The in-memory provider here backs the test suite and hosts that run
//! without a database.

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemorySchemaStore, MemoryStoreProvider};
pub use traits::{schema_name, SchemaStore, StoreProvider};
