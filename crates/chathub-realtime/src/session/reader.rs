//! The per-connection reader task.
//!
//! Owns the receiving half of the socket. Valid client messages go to the
//! supervisor's inbound channel; the terminal condition goes to the error
//! channel. Exits promptly once the session's done signal flips.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use futures::stream::SplitStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::wire::{WireError, WireMessage};

use super::client::ClientSession;

/// Why the reader stopped.
#[derive(Debug)]
pub(crate) enum SessionError {
    /// Peer closed the connection or the stream ended.
    Eof,
    /// Peer sent a binary frame.
    GotBinary,
    /// Peer sent an unparseable frame.
    Protocol(String),
    /// The socket read failed.
    Transport(String),
}

/// Runs until the socket yields a terminal condition or `done` flips.
pub(crate) async fn run_reader(
    mut stream: SplitStream<WebSocket>,
    session: Arc<ClientSession>,
    inbound_tx: mpsc::Sender<WireMessage>,
    error_tx: mpsc::Sender<SessionError>,
) {
    let mut done = session.done_signal();

    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = done.changed() => return,
        };

        let err = match frame {
            None => SessionError::Eof,
            Some(Err(e)) => SessionError::Transport(e.to_string()),
            Some(Ok(Message::Close(_))) => SessionError::Eof,
            Some(Ok(Message::Binary(_))) => SessionError::GotBinary,
            Some(Ok(Message::Ping(_))) => continue,
            Some(Ok(Message::Pong(_))) => {
                session.ping_miss.store(0, Ordering::Relaxed);
                continue;
            }
            Some(Ok(Message::Text(text))) => {
                match WireMessage::decode(text.as_str()) {
                    // Only strictly positive ids may arrive from a client;
                    // the server sentinel is emission-only.
                    Ok(msg) if msg.id >= 1 => {
                        tokio::select! {
                            sent = inbound_tx.send(msg) => {
                                if sent.is_err() {
                                    return;
                                }
                            }
                            _ = done.changed() => return,
                        }
                        continue;
                    }
                    Ok(msg) => {
                        debug!(id = msg.id, "dropping frame with reserved id");
                        continue;
                    }
                    Err(WireError::BadMessageId) => {
                        debug!("dropping frame with bad message id");
                        continue;
                    }
                    Err(e) => SessionError::Protocol(e.to_string()),
                }
            }
        };

        tokio::select! {
            _ = error_tx.send(err) => {}
            _ = done.changed() => {}
        }
        return;
    }
}
