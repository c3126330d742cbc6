//! Maps inbound command names to handlers and shields the supervisor from
//! handler faults.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::error;

use chathub_core::error::AppError;

use crate::engine::PubSubEngine;
use crate::session::ClientSession;
use crate::wire::WireMessage;
use crate::wire::message::{CMD_ERROR, CMD_OK};

/// What a handler decided to do with a command.
#[derive(Debug)]
pub enum Reply {
    /// Respond right away with an `ok` frame, optionally carrying a value.
    Ok(Option<Value>),
    /// No immediate reply. The handler registered with the session's job
    /// tracker and will post its reply through the outbound endpoint.
    Deferred,
}

/// Future returned by a command handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Reply, AppError>>;

/// A command handler.
///
/// Runs on the supervisor task; it may await locks and channel operations
/// but must not block for long. Long work belongs on a deferred task.
pub type CommandHandler =
    for<'a> fn(&'a PubSubEngine, &'a Arc<ClientSession>, &'a WireMessage) -> HandlerFuture<'a>;

/// The command table, built once per engine.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.handlers.len())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the built-in command set.
    pub fn new() -> Self {
        Self {
            handlers: super::handlers::builtin_handlers(),
        }
    }

    /// Creates an empty dispatcher (tests install their own handlers).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Installs or replaces a handler.
    pub fn register(&mut self, command: &'static str, handler: CommandHandler) {
        self.handlers.insert(command, handler);
    }

    /// Invokes the handler for a message inside a panic guard.
    ///
    /// Returns the frame to write immediately, or `None` when the handler
    /// deferred its reply. A panicking handler yields an `error` reply and
    /// leaves the connection open.
    pub async fn dispatch(
        &self,
        engine: &PubSubEngine,
        session: &Arc<ClientSession>,
        msg: &WireMessage,
    ) -> Option<WireMessage> {
        engine
            .metrics
            .commands_dispatched
            .fetch_add(1, Ordering::Relaxed);

        let handler = match self.handlers.get(msg.command.as_str()) {
            Some(handler) => handler,
            None => return Some(error_frame(msg.id, "unknown command")),
        };

        let outcome = std::panic::AssertUnwindSafe(handler(engine, session, msg))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(Reply::Ok(args))) => Some(ok_frame(msg.id, args)),
            Ok(Ok(Reply::Deferred)) => None,
            Ok(Err(e)) => Some(error_frame(msg.id, &e.message)),
            Err(_) => {
                error!(command = %msg.command, "command handler panicked");
                Some(error_frame(msg.id, "internal error"))
            }
        }
    }
}

/// Builds a success reply carrying the client's message id.
pub fn ok_frame(id: i64, args: Option<Value>) -> WireMessage {
    match args {
        Some(args) => WireMessage::with_args(id, CMD_OK, args),
        None => WireMessage::new(id, CMD_OK),
    }
}

/// Builds a failure reply carrying the client's message id.
pub fn error_frame(id: i64, text: &str) -> WireMessage {
    WireMessage::with_args(id, CMD_ERROR, Value::String(text.to_string()))
}
