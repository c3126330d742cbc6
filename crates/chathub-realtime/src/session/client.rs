//! Client session state.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU32;

use tokio::sync::{Mutex, watch};
use tokio_util::task::TaskTracker;

use crate::registry::Endpoint;

/// Mutable session fields guarded by the session mutex.
#[derive(Debug, Default)]
pub struct SessionFields {
    /// Protocol version from the hello payload; empty until hello arrives.
    pub protocol_version: String,
    /// Topics this session is currently subscribed to.
    pub current_channels: HashSet<String>,
    /// Topics subscribed to but not yet caught up by a backlog fetch.
    pub pending_subscriptions: Vec<String>,
}

/// State for one client connection.
///
/// The session exclusively owns the receiving half of its endpoint; the
/// registry only ever holds identity handles, which the session withdraws
/// during teardown before the endpoint is closed.
#[derive(Debug)]
pub struct ClientSession {
    /// Peer address, for logs.
    pub remote_addr: SocketAddr,
    /// Delivery endpoint registered into subscriber sets.
    pub endpoint: Endpoint,
    /// Consecutive ping ticks without a pong. Reset by the reader on any
    /// pong, bumped by the supervisor on each inactivity tick.
    pub ping_miss: AtomicU32,
    /// Mutable fields under the session mutex.
    pub state: Mutex<SessionFields>,
    /// Deferred command handlers still running.
    pub jobs: TaskTracker,
    /// Flipped exactly once when the supervisor starts teardown.
    done: watch::Sender<bool>,
}

impl ClientSession {
    /// Creates session state around an endpoint.
    pub fn new(remote_addr: SocketAddr, endpoint: Endpoint) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            remote_addr,
            endpoint,
            ping_miss: AtomicU32::new(0),
            state: Mutex::new(SessionFields::default()),
            jobs: TaskTracker::new(),
            done,
        }
    }

    /// A receiver that resolves when the session is told to stop.
    ///
    /// Every per-session task selects on this.
    pub fn done_signal(&self) -> watch::Receiver<bool> {
        self.done.subscribe()
    }

    /// Signals all per-session tasks to stop.
    pub fn signal_done(&self) {
        let _ = self.done.send(true);
    }
}
