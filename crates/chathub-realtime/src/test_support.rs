//! Shared helpers for in-crate tests.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use chathub_core::config::PubSubConfig;
use chathub_core::result::AppResult;
use chathub_core::traits::BackendNotifier;

use crate::registry::Endpoint;
use crate::session::ClientSession;
use crate::wire::WireMessage;

/// Notifier that records every notice it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub new_topics: Mutex<Vec<String>>,
    pub reaped_batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl BackendNotifier for RecordingNotifier {
    async fn startup(&self) -> AppResult<()> {
        Ok(())
    }

    async fn new_topic(&self, topic: &str) -> AppResult<()> {
        self.new_topics.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn topics_reaped(&self, topics: &[String]) -> AppResult<()> {
        self.reaped_batches.lock().await.push(topics.to_vec());
        Ok(())
    }
}

/// Config with a short send timeout so dropped-delivery tests stay fast.
pub(crate) fn test_config() -> PubSubConfig {
    PubSubConfig {
        publish_send_timeout_ms: 50,
        ..PubSubConfig::default()
    }
}

pub(crate) fn test_endpoint(capacity: usize) -> (Endpoint, mpsc::Receiver<WireMessage>) {
    Endpoint::new(capacity)
}

pub(crate) fn test_session(endpoint: Endpoint) -> Arc<ClientSession> {
    let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
    Arc::new(ClientSession::new(addr, endpoint))
}
