pub mod bus;
pub mod core;
pub mod extension;
pub mod plugin;
pub mod queue;
pub mod services;
pub mod store;

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Parse the API version string from build script into u32
pub fn get_plugin_api_version() -> u32 {
    PLUGIN_API_VERSION.parse().unwrap_or(20250801)
}
