//! Extension Point Manager
//!
//! Lets a plugin obtain a handle to a capability before the capability's
//! provider has registered. Calls made early are buffered and replayed, in
//! order, exactly once, the instant a provider attaches. This allows a
//! consumer plugin that initializes before its provider to safely call
//! provider methods during its own init phase.
//!
//! The handle is an explicit two-state object rather than a dynamic proxy:
//! `Pending` records calls into an ordered buffer, `Bound` forwards them to
//! the real implementation. The transition happens exactly once per binding.

mod error;
mod manager;
mod proxy;

pub use error::{ExtensionError, ExtensionResult};
pub use manager::{ExtensionPoint, ExtensionPointManager};
pub use proxy::ExtensionProxy;
