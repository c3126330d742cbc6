//! Backend collaborator configuration.

use serde::{Deserialize, Serialize};

/// Settings for the backend that receives topic lifecycle notices.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    /// Whether notices are sent at all. When disabled, the engine uses a
    /// no-op notifier.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL the notices are posted to, e.g. `https://backend.example`.
    #[serde(default)]
    pub announce_url: String,
    /// Request timeout for notice posts, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}
