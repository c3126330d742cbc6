//! Engine metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct PubSubMetrics {
    /// Total connections ever accepted
    pub connections_total: AtomicU64,
    /// Connections currently alive
    pub connections_active: AtomicU64,
    /// Publish calls performed
    pub messages_published: AtomicU64,
    /// Individual endpoint deliveries that succeeded
    pub messages_delivered: AtomicU64,
    /// Deliveries dropped because a subscriber outbox stayed full past the
    /// send timeout
    pub deliveries_dropped: AtomicU64,
    /// Topic records created
    pub topics_created: AtomicU64,
    /// Topic records reaped by the janitor
    pub topics_reaped: AtomicU64,
    /// Commands dispatched to handlers
    pub commands_dispatched: AtomicU64,
    /// Emote usage reports aggregated
    pub emote_uses: AtomicU64,
}

impl PubSubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn delivery_dropped(&self) {
        self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self, count: u64) {
        self.messages_delivered.fetch_add(count, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            topics_created: self.topics_created.load(Ordering::Relaxed),
            topics_reaped: self.topics_reaped.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            emote_uses: self.emote_uses.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever accepted
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Publish calls performed
    pub messages_published: u64,
    /// Individual endpoint deliveries that succeeded
    pub messages_delivered: u64,
    /// Deliveries dropped on send timeout
    pub deliveries_dropped: u64,
    /// Topic records created
    pub topics_created: u64,
    /// Topic records reaped
    pub topics_reaped: u64,
    /// Commands dispatched
    pub commands_dispatched: u64,
    /// Emote usage reports aggregated
    pub emote_uses: u64,
}
