//! Hooks emitted by the plugin loader

use crate::bus::Hook;
use serde::{Deserialize, Serialize};

/// Payload of [`PERMISSIONS_REGISTERED`], grouping one plugin's permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionsRegistered {
    pub plugin_id: String,
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Namespaced id, `"{plugin_id}.{raw_id}"`
    pub id: String,
    pub description: Option<String>,
}

/// Emitted once per plugin with recorded permissions, at the start of the
/// AfterPluginsReady phase, so an auth plugin can sync them
pub const PERMISSIONS_REGISTERED: Hook<PermissionsRegistered> =
    Hook::new("core.permissionsRegistered");
