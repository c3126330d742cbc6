//! Pub/sub core configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the subscription registry, publisher, janitor, and the
/// per-connection liveness policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// Per-endpoint outbound queue bound.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// Per-subscriber enqueue timeout during fan-out, in milliseconds.
    #[serde(default = "default_publish_send_timeout")]
    pub publish_send_timeout_ms: u64,
    /// Janitor period for reaping empty topic records, in seconds.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
    /// Inactivity interval between server pings, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Consecutive unacknowledged pings before the connection is closed.
    #[serde(default = "default_ping_miss_limit")]
    pub ping_miss_limit: u32,
}

impl PubSubConfig {
    /// Per-subscriber enqueue timeout as a [`Duration`].
    pub fn publish_send_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_send_timeout_ms)
    }

    /// Janitor period as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Ping inactivity interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
            publish_send_timeout_ms: default_publish_send_timeout(),
            reap_interval_secs: default_reap_interval(),
            ping_interval_secs: default_ping_interval(),
            ping_miss_limit: default_ping_miss_limit(),
        }
    }
}

fn default_outbox_capacity() -> usize {
    64
}

fn default_publish_send_timeout() -> u64 {
    250
}

fn default_reap_interval() -> u64 {
    60
}

fn default_ping_interval() -> u64 {
    60
}

fn default_ping_miss_limit() -> u32 {
    5
}
