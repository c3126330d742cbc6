//! Framed line-oriented wire protocol spoken with clients.

pub mod message;

pub use message::{SERVER_MESSAGE_ID, WireError, WireMessage};
