//! HTTP server configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins accepted for WebSocket upgrades. Empty list accepts any
    /// origin (development only).
    #[serde(default)]
    pub origin_allowlist: Vec<String>,
    /// Path to the HTML banner served to non-upgrade requests. When the
    /// file is missing, a built-in banner is used.
    #[serde(default = "default_banner_path")]
    pub banner_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            origin_allowlist: Vec::new(),
            banner_path: default_banner_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_banner_path() -> String {
    "index.html".to_string()
}
