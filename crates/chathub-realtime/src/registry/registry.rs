//! The subscription registry and its locking discipline.
//!
//! Two lock levels: one registry lock guarding the topic map's structure,
//! and a per-record lock guarding each record's member list. Lock order is
//! registry before record. The registry lock is taken as a reader on every
//! path except record insert/delete; promotion releases the reader,
//! acquires the writer, and re-checks the map, because there is no atomic
//! upgrade. The session mutex is only ever taken inside the registry read
//! lock, never the reverse.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use chathub_core::config::PubSubConfig;
use chathub_core::traits::BackendNotifier;

use crate::metrics::PubSubMetrics;
use crate::session::ClientSession;

use super::subscriber::{Endpoint, EndpointId, SubscriberSet};

/// Registry of all topic records plus the global subscriber set.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    /// Topic name → record. The outer lock guards map structure only.
    topics: RwLock<HashMap<String, Arc<SubscriberSet>>>,
    /// The unnamed set that receives every global broadcast.
    global: SubscriberSet,
    /// Backend told about topic lifecycle events.
    notifier: Arc<dyn BackendNotifier>,
    /// Shared engine counters.
    pub(crate) metrics: Arc<PubSubMetrics>,
    /// Pub/sub settings (send timeout for the publisher).
    pub(crate) config: PubSubConfig,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new(
        config: PubSubConfig,
        notifier: Arc<dyn BackendNotifier>,
        metrics: Arc<PubSubMetrics>,
    ) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            global: SubscriberSet::new(),
            notifier,
            metrics,
            config,
        }
    }

    /// Subscribes an endpoint to a topic, creating the record on first use.
    ///
    /// Idempotent: subscribing the same endpoint twice leaves one member.
    /// Actual record creation fires a new-topic notice to the backend on a
    /// detached task.
    pub async fn subscribe(&self, topic: &str, endpoint: &Endpoint) {
        {
            let topics = self.topics.read().await;
            if let Some(record) = topics.get(topic) {
                record.add(endpoint).await;
                return;
            }
        }

        // Promotion: the reader is gone, take the writer and re-check,
        // since another subscriber may have created the record meanwhile.
        let existing = {
            let mut topics = self.topics.write().await;
            match topics.get(topic) {
                Some(record) => Some(Arc::clone(record)),
                None => {
                    // Born populated, so the janitor can never reap it
                    // before the first member lands.
                    let record = Arc::new(SubscriberSet::with_member(endpoint.clone()));
                    topics.insert(topic.to_string(), record);
                    None
                }
            }
        };

        match existing {
            Some(record) => {
                record.add(endpoint).await;
            }
            None => {
                self.metrics
                    .topics_created
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!(topic = %topic, "topic record created");

                let notifier = Arc::clone(&self.notifier);
                let name = topic.to_string();
                tokio::spawn(async move {
                    if let Err(e) = notifier.new_topic(&name).await {
                        warn!(topic = %name, error = %e, "failed to report new topic");
                    }
                });
            }
        }
    }

    /// Adds an endpoint to the global subscriber set.
    pub async fn subscribe_global(&self, endpoint: &Endpoint) {
        self.global.add(endpoint).await;
    }

    /// Removes an endpoint from a topic's record, if both exist.
    ///
    /// The record itself is never deleted here; the janitor reclaims empty
    /// records on its own clock.
    pub async fn unsubscribe(&self, topic: &str, id: EndpointId) {
        let topics = self.topics.read().await;
        if let Some(record) = topics.get(topic) {
            record.remove(id).await;
        }
    }

    /// Withdraws a session's endpoint from every set and clears its
    /// subscription bookkeeping.
    ///
    /// Lock order: session mutex alone for the pending backlog, then the
    /// global write lock, then session mutex inside the registry read lock
    /// for the per-topic removals.
    pub async fn unsubscribe_all(&self, session: &ClientSession) {
        {
            let mut fields = session.state.lock().await;
            fields.pending_subscriptions.clear();
        }

        self.global.remove(session.endpoint.id).await;

        let topics = self.topics.read().await;
        let mut fields = session.state.lock().await;
        for name in fields.current_channels.iter() {
            if let Some(record) = topics.get(name) {
                record.remove(session.endpoint.id).await;
            }
        }
        fields.current_channels.clear();
    }

    /// Empties the topic map and the global set. Shutdown/test reset only.
    pub async fn clear_all(&self) {
        let mut topics = self.topics.write().await;
        topics.clear();
        self.global.clear().await;
        info!("subscription registry cleared");
    }

    /// Removes and returns the names of all empty topic records.
    ///
    /// Runs under the registry write lock so no record can gain a member
    /// between the emptiness check and the removal.
    pub(crate) async fn reap_empty(&self) -> Vec<String> {
        let mut topics = self.topics.write().await;
        let mut reaped = Vec::new();
        for (name, record) in topics.iter() {
            if record.is_empty().await {
                reaped.push(name.clone());
            }
        }
        for name in &reaped {
            topics.remove(name);
        }
        reaped
    }

    /// Snapshot of a topic's members, if the record exists.
    pub(crate) async fn topic_members(&self, topic: &str) -> Option<Vec<Endpoint>> {
        let record = {
            let topics = self.topics.read().await;
            topics.get(topic).map(Arc::clone)
        };
        match record {
            Some(record) => Some(record.snapshot().await),
            None => None,
        }
    }

    /// Snapshot of the global set's members.
    pub(crate) async fn global_members(&self) -> Vec<Endpoint> {
        self.global.snapshot().await
    }

    /// Number of live topic records.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Whether a record exists for the topic.
    pub async fn has_topic(&self, topic: &str) -> bool {
        self.topics.read().await.contains_key(topic)
    }

    /// Member count for one topic (0 when the record is absent).
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let record = {
            let topics = self.topics.read().await;
            topics.get(topic).map(Arc::clone)
        };
        match record {
            Some(record) => record.len().await,
            None => 0,
        }
    }

    /// Member count of the global set.
    pub async fn global_count(&self) -> usize {
        self.global.len().await
    }
}
