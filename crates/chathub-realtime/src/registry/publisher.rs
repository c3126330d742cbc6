//! Fan-out publishing over the registry.
//!
//! Every publish path snapshots the member endpoints under the locks and
//! releases them before the first enqueue, so a slow subscriber can never
//! stall the registry. Enqueues run against each endpoint's bounded outbox
//! with the configured per-send timeout; a timeout drops the message for
//! that endpoint only.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::wire::WireMessage;

use super::registry::SubscriptionRegistry;
use super::subscriber::{Endpoint, EndpointId};

impl SubscriptionRegistry {
    /// Publishes a message to every subscriber of one topic.
    ///
    /// Returns the number of endpoints the message was written to.
    pub async fn publish(&self, topic: &str, msg: &WireMessage) -> usize {
        self.metrics.messages_published.fetch_add(1, Ordering::Relaxed);

        let members = match self.topic_members(topic).await {
            Some(members) => members,
            None => {
                debug!(topic = %topic, "publish to unknown topic");
                return 0;
            }
        };

        self.deliver(&members, msg).await
    }

    /// Publishes a message once to every endpoint subscribed to any of the
    /// listed topics.
    ///
    /// The union is deduplicated by endpoint identity, so a client
    /// subscribed to several of the topics still receives the message
    /// exactly once. Returns the number of distinct endpoints written to.
    pub async fn publish_multi(&self, topics: &[String], msg: &WireMessage) -> usize {
        self.metrics.messages_published.fetch_add(1, Ordering::Relaxed);

        let mut found: HashMap<EndpointId, Endpoint> = HashMap::new();
        for name in topics {
            if let Some(members) = self.topic_members(name).await {
                for endpoint in members {
                    found.entry(endpoint.id).or_insert(endpoint);
                }
            }
        }

        let members: Vec<Endpoint> = found.into_values().collect();
        self.deliver(&members, msg).await
    }

    /// Publishes a message to every member of the global set.
    pub async fn publish_global(&self, msg: &WireMessage) -> usize {
        self.metrics.messages_published.fetch_add(1, Ordering::Relaxed);

        let members = self.global_members().await;
        self.deliver(&members, msg).await
    }

    /// Enqueues a message on each endpoint in turn.
    ///
    /// No lock is held here. A closed endpoint (session mid-teardown) is
    /// skipped; an outbox that stays full past the send timeout costs that
    /// endpoint this message and bumps the dropped-delivery counter.
    async fn deliver(&self, members: &[Endpoint], msg: &WireMessage) -> usize {
        let send_timeout = self.config.publish_send_timeout();
        let mut count = 0;

        for endpoint in members {
            match timeout(send_timeout, endpoint.send(msg.clone())).await {
                Ok(Ok(())) => count += 1,
                Ok(Err(_)) => {
                    debug!(endpoint = %endpoint.id, "skipping closed endpoint");
                }
                Err(_) => {
                    self.metrics.delivery_dropped();
                    warn!(
                        endpoint = %endpoint.id,
                        command = %msg.command,
                        "subscriber outbox full, dropping delivery"
                    );
                }
            }
        }

        self.metrics.delivered(count as u64);
        count
    }
}
