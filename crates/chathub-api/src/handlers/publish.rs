//! Backend publish endpoints.
//!
//! Publishes originate from the backend over HTTP and fan out to the
//! subscribed WebSocket clients. The channel list picks the fan-out shape:
//! empty → global broadcast, one → single topic, several → deduplicated
//! multi-topic publish.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use chathub_core::error::AppError;
use chathub_realtime::wire::{SERVER_MESSAGE_ID, WireMessage};

use crate::state::AppState;

/// Body of POST /pub.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Target channels. Empty means the global firehose.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Command token of the emitted frame.
    pub command: String,
    /// Optional JSON argument value of the emitted frame.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Body of the publish response.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Number of endpoints the message was written to.
    pub count: usize,
}

/// POST /pub — fan a server-initiated message out to subscribers.
pub async fn backend_publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    if req.command.is_empty() || req.command.contains(char::is_whitespace) {
        return Err(AppError::bad_request(
            "command must be a non-empty token without whitespace",
        ));
    }

    let msg = match req.arguments {
        Some(args) => WireMessage::with_args(SERVER_MESSAGE_ID, req.command.clone(), args),
        None => WireMessage::new(SERVER_MESSAGE_ID, req.command.clone()),
    };

    let registry = &state.engine.registry;
    let count = match req.channels.as_slice() {
        [] => registry.publish_global(&msg).await,
        [channel] => registry.publish(channel, &msg).await,
        channels => registry.publish_multi(channels, &msg).await,
    };

    debug!(
        command = %req.command,
        channels = req.channels.len(),
        count,
        "backend publish"
    );

    Ok(Json(PublishResponse { count }))
}
