//! Command dispatch: handler lookup, panic isolation, reply framing.

pub mod dispatcher;
pub mod handlers;

pub use dispatcher::{CommandHandler, Dispatcher, HandlerFuture, Reply};
