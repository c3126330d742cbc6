//! Application state shared across all handlers.

use std::sync::Arc;

use chathub_core::config::AppConfig;
use chathub_realtime::PubSubEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// The pub/sub engine
    pub engine: Arc<PubSubEngine>,
    /// Banner HTML served to non-upgrade requests
    pub banner: Arc<String>,
}
