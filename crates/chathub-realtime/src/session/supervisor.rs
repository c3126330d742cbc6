//! The per-connection supervisor task.
//!
//! Owns the writing half of the socket and multiplexes inbound commands,
//! outbound deliveries, the reader's terminal error, and the inactivity
//! ping timer. Writer actions happen inline; there is no separate writer
//! task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::PubSubEngine;
use crate::registry::Endpoint;
use crate::wire::{WireMessage, message::CMD_HELLO};

use super::client::ClientSession;
use super::reader::{self, SessionError};

/// Deadline for every socket write, control frames included.
const WRITE_DEADLINE: Duration = Duration::from_secs(60);

/// Bound of the reader → supervisor message channel.
const INBOUND_BUFFER: usize = 16;

const CLOSE_GOT_BINARY: &str = "got binary packet";
const CLOSE_TIMED_OUT: &str = "no ping replies for 5 minutes";
const CLOSE_NOT_HELLO: &str = "Error - the first message sent must be a 'hello'";

/// Drives one client connection from accept to close.
///
/// Spawned by the upgrade handler; returns once teardown has finished and
/// the endpoint is closed.
pub async fn run_session(engine: Arc<PubSubEngine>, socket: WebSocket, remote_addr: SocketAddr) {
    let (endpoint, outbound_rx) = Endpoint::new(engine.config.outbox_capacity);
    let session = Arc::new(ClientSession::new(remote_addr, endpoint));

    engine.metrics.connection_opened();
    info!(remote = %remote_addr, endpoint = %session.endpoint.id, "socket connection opened");

    let (mut sink, stream) = socket.split();
    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_BUFFER);
    let (error_tx, mut error_rx) = mpsc::channel(1);

    tokio::spawn(reader::run_reader(
        stream,
        Arc::clone(&session),
        inbound_tx,
        error_tx,
    ));

    let mut outbound_rx = outbound_rx;
    let ping_interval = engine.config.ping_interval();
    let ping_miss_limit = engine.config.ping_miss_limit;

    loop {
        tokio::select! {
            // The reader drops both channels when it exits; poll the error
            // channel first so the terminal condition is never lost to the
            // closed inbound channel.
            biased;

            err = error_rx.recv() => {
                match err.unwrap_or(SessionError::Eof) {
                    SessionError::Eof => {}
                    SessionError::GotBinary => {
                        close_with(&mut sink, close_code::UNSUPPORTED, CLOSE_GOT_BINARY).await;
                    }
                    SessionError::Protocol(text) | SessionError::Transport(text) => {
                        warn!(remote = %remote_addr, error = %text, "closing broken connection");
                        close_with(&mut sink, close_code::ERROR, &text).await;
                    }
                }
                break;
            }

            msg = inbound_rx.recv() => {
                let Some(msg) = msg else { break };

                let awaiting_hello = session.state.lock().await.protocol_version.is_empty();
                if awaiting_hello && msg.command != CMD_HELLO {
                    warn!(remote = %remote_addr, command = %msg.command, "first message was not hello");
                    close_with(&mut sink, close_code::POLICY, CLOSE_NOT_HELLO).await;
                    break;
                }

                if let Some(reply) = engine.dispatch(&session, &msg).await {
                    if write_frame(&mut sink, &reply).await.is_err() {
                        break;
                    }
                }
            }

            delivery = outbound_rx.recv() => {
                // The session holds a sender itself, so this arm never sees
                // a closed channel while the loop runs.
                let Some(msg) = delivery else { break };
                if write_frame(&mut sink, &msg).await.is_err() {
                    break;
                }
            }

            // Re-armed every loop turn: fires only after a full quiet
            // interval on this connection.
            _ = tokio::time::sleep(ping_interval) => {
                let missed = session.ping_miss.fetch_add(1, Ordering::Relaxed) + 1;
                if missed >= ping_miss_limit {
                    info!(remote = %remote_addr, "no pong replies, closing");
                    close_with(&mut sink, close_code::STATUS, CLOSE_TIMED_OUT).await;
                    break;
                }
                let stamp = chrono::Utc::now().timestamp().to_string();
                let ping = Message::Ping(stamp.into_bytes().into());
                if timeout(WRITE_DEADLINE, sink.send(ping)).await.is_err() {
                    break;
                }
            }
        }
    }

    teardown(&engine, &session, outbound_rx).await;

    engine.metrics.connection_closed();
    info!(remote = %remote_addr, endpoint = %session.endpoint.id, "socket connection closed");
}

/// The ordered teardown. After this returns no publisher can enqueue to the
/// session's endpoint again.
async fn teardown(
    engine: &PubSubEngine,
    session: &Arc<ClientSession>,
    outbound_rx: mpsc::Receiver<WireMessage>,
) {
    // 1. Stop the reader (and any deferred handler watching the signal).
    session.signal_done();

    // 2. Keep consuming deliveries so publishers blocked on this outbox
    //    can finish while we withdraw from the subscriber sets.
    let (close_tx, close_rx) = oneshot::channel();
    let drain = tokio::spawn(drain_outbox(outbound_rx, close_rx));

    // 3. Withdraw the endpoint from every subscriber set.
    engine.registry.unsubscribe_all(session).await;

    // 4. Deferred handlers must finish before the endpoint goes away.
    session.jobs.close();
    session.jobs.wait().await;

    // 5. Close the endpoint; the drain task exits once the buffer is empty.
    let _ = close_tx.send(());
    let _ = drain.await;
}

/// Consumes deliveries until ordered to close, then closes the receiver and
/// drains whatever is still buffered.
async fn drain_outbox(mut rx: mpsc::Receiver<WireMessage>, mut close: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            msg = rx.recv() => {
                if msg.is_none() {
                    return;
                }
            }
            _ = &mut close => break,
        }
    }
    rx.close();
    while rx.recv().await.is_some() {}
}

/// Marshals a frame and writes it under the socket write deadline.
async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &WireMessage,
) -> Result<(), ()> {
    let text = msg.encode();
    match timeout(WRITE_DEADLINE, sink.send(Message::Text(text.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!(error = %e, "socket write failed");
            Err(())
        }
        Err(_) => {
            debug!("socket write timed out");
            Err(())
        }
    }
}

/// Sends a close frame, best effort.
async fn close_with(sink: &mut SplitSink<WebSocket, Message>, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    let _ = timeout(WRITE_DEADLINE, sink.send(Message::Close(Some(frame)))).await;
}
