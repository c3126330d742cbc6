//! Application builder — wires router, state, and engine into an Axum app.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chathub_core::config::AppConfig;
use chathub_core::error::AppError;
use chathub_realtime::PubSubEngine;

use crate::handlers;
use crate::notifier::build_notifier;
use crate::state::AppState;

/// Banner used when the configured banner file is missing.
const DEFAULT_BANNER: &str =
    "<!DOCTYPE html>\n<html><body><h1>ChatHub</h1><p>This is a WebSocket endpoint.</p></body></html>\n";

/// Builds the complete Axum application with all routes.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::ws::ws_or_banner))
        .route("/pub", post(handlers::publish::backend_publish))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the engine and state for a configuration.
///
/// Split out of [`run_server`] so tests can host the same app on an
/// ephemeral listener.
pub fn build_state(config: AppConfig) -> Result<AppState, AppError> {
    let notifier = build_notifier(&config.backend)?;
    let engine = Arc::new(PubSubEngine::new(config.pubsub.clone(), notifier));
    let banner = Arc::new(load_banner(&config.server.banner_path));

    Ok(AppState {
        config: Arc::new(config),
        engine,
        banner,
    })
}

/// Starts the server and runs until interrupted.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    let state = build_state(config)?;
    let engine = Arc::clone(&state.engine);

    let janitor = engine.spawn_janitor();
    announce_startup(&state);

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "ChatHub listening");

    let app = build_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("server error: {e}")))?;

    engine.shutdown().await;
    let _ = janitor.await;
    Ok(())
}

/// Tells the backend the server is up, on a detached task.
fn announce_startup(state: &AppState) {
    let notifier = state.engine.notifier();
    tokio::spawn(async move {
        if let Err(e) = notifier.startup().await {
            warn!(error = %e, "startup announce failed");
        }
    });
}

/// Reads the banner file, falling back to the built-in banner.
fn load_banner(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(banner) => banner,
        Err(_) => {
            info!(path = %path, "banner file missing, using built-in banner");
            DEFAULT_BANNER.to_string()
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
