//! Per-connection client sessions: state, reader task, supervisor loop.

pub mod client;
pub mod supervisor;

mod reader;

pub use client::{ClientSession, SessionFields};
pub use supervisor::run_session;
