//! # chathub-api
//!
//! HTTP layer for ChatHub built on Axum.
//!
//! Provides the WebSocket upgrade endpoint with origin checking, the static
//! banner for plain browsers, the backend publish endpoints, and the
//! HTTP implementation of the backend notifier.

pub mod app;
pub mod handlers;
pub mod notifier;
pub mod state;

pub use app::build_app;
pub use state::AppState;
