//! Inter-Plugin Event Bus
//!
//! Hook-typed pub/sub layer wiring plugins together once they are
//! initialized. Two delivery modes share one API surface:
//!
//! - **Broadcast** (default): every subscribed listener receives every
//!   event. Delivery for a single emit is sequential across listeners, and
//!   each listener's error is caught and logged without affecting the
//!   others or the emitter.
//! - **Work-queue**: listeners name a worker group, and the bus backs the
//!   subscription with a persistent queue obtained from the injected
//!   `QueueFactory`. Each emitted event becomes one job per registered
//!   queue namespace, claimed by exactly one consumer.
//!
//! Work-queue namespaces are `{plugin_id}:{hook_id}:{worker_group}`.
//! Because the owning plugin id is part of the namespace, two different
//! plugins using the same worker-group string get independent queues and
//! each independently receives every event; worker groups distribute load
//! only within a single plugin, never across plugins.
//!
//! Payloads are serde types, serialized once per emit; each delivery
//! deserializes for its typed listener. A payload that fails to deserialize
//! counts as that listener's error.

mod error;
mod handle;
mod hook;

#[allow(clippy::module_inception)]
mod bus;

pub use bus::{EventBus, ListenerError, Subscription};
pub use error::{BusError, BusResult};
pub use handle::PluginBusHandle;
pub use hook::{DeliveryMode, Hook, SubscribeOptions};
