//! Shared Infrastructure
//!
//! Cross-cutting pieces used by every subsystem: logging setup and the
//! runtime API version helpers.

pub mod logging;
