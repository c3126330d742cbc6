//! WebSocket upgrade handler and the banner fallback.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, warn};

use chathub_realtime::session::run_session;

use crate::state::AppState;

/// GET / — upgrade to a WebSocket session, or serve the banner to anything
/// that is not an upgrade request.
pub async fn ws_or_banner(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(ws) = ws else {
        return Html(state.banner.as_ref().clone()).into_response();
    };

    if !origin_allowed(&state.config.server.origin_allowlist, &headers) {
        warn!(remote = %remote_addr, "upgrade rejected, origin not allowed");
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    debug!(remote = %remote_addr, "upgrading connection");
    let engine = Arc::clone(&state.engine);
    ws.on_upgrade(move |socket| run_session(engine, socket, remote_addr))
}

/// Checks the Origin header against the configured allowlist.
/// An empty allowlist accepts any origin.
fn origin_allowed(allowlist: &[String], headers: &HeaderMap) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowlist.iter().any(|allowed| allowed == origin),
        None => false,
    }
}
