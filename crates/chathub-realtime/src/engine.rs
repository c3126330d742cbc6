//! The pub/sub engine: one well-known instance tying the registry, the
//! janitor, metrics, and the command table together.
//!
//! Constructed once at startup and injected everywhere; tests build a fresh
//! engine per case instead of resetting shared state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use chathub_core::config::PubSubConfig;
use chathub_core::traits::BackendNotifier;

use crate::dispatch::Dispatcher;
use crate::metrics::PubSubMetrics;
use crate::registry::{Janitor, SubscriptionRegistry};
use crate::session::ClientSession;
use crate::wire::WireMessage;

/// Central pub/sub engine.
#[derive(Debug)]
pub struct PubSubEngine {
    /// Pub/sub settings.
    pub config: PubSubConfig,
    /// Subscription registry (topic records + global set).
    pub registry: Arc<SubscriptionRegistry>,
    /// Engine counters.
    pub metrics: Arc<PubSubMetrics>,
    /// Backend told about topic lifecycle events.
    notifier: Arc<dyn BackendNotifier>,
    /// Command table.
    dispatcher: Dispatcher,
    /// Process-level shutdown signal.
    shutdown_tx: watch::Sender<bool>,
}

impl PubSubEngine {
    /// Creates an engine with the built-in command set.
    pub fn new(config: PubSubConfig, notifier: Arc<dyn BackendNotifier>) -> Self {
        let metrics = Arc::new(PubSubMetrics::new());
        let registry = Arc::new(SubscriptionRegistry::new(
            config.clone(),
            Arc::clone(&notifier),
            Arc::clone(&metrics),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        info!("pub/sub engine initialized");

        Self {
            config,
            registry,
            metrics,
            notifier,
            dispatcher: Dispatcher::new(),
            shutdown_tx,
        }
    }

    /// Replaces the command table. Tests use this to install probes.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Starts the janitor on its configured cadence.
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let janitor = Janitor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.notifier),
            Arc::clone(&self.metrics),
            self.config.reap_interval(),
        );
        let cancel = self.shutdown_tx.subscribe();
        tokio::spawn(async move { janitor.run(cancel).await })
    }

    /// A receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// The backend notifier this engine reports to.
    pub fn notifier(&self) -> Arc<dyn BackendNotifier> {
        Arc::clone(&self.notifier)
    }

    /// Initiates shutdown: stops the janitor and empties the registry.
    pub async fn shutdown(&self) {
        info!("shutting down pub/sub engine");
        let _ = self.shutdown_tx.send(true);
        self.registry.clear_all().await;
    }

    /// Dispatches one inbound message. See [`Dispatcher::dispatch`].
    pub async fn dispatch(
        &self,
        session: &Arc<ClientSession>,
        msg: &WireMessage,
    ) -> Option<WireMessage> {
        self.dispatcher.dispatch(self, session, msg).await
    }
}
