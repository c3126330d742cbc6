//! Periodic reaper of empty topic records.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use chathub_core::traits::BackendNotifier;

use crate::metrics::PubSubMetrics;

use super::registry::SubscriptionRegistry;

/// Reaps topic records that have lost their last subscriber.
///
/// Records are created populated, so a record observed empty under the
/// registry write lock is genuinely abandoned.
pub struct Janitor {
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<dyn BackendNotifier>,
    metrics: Arc<PubSubMetrics>,
    period: Duration,
}

impl Janitor {
    /// Creates a janitor over a registry.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        notifier: Arc<dyn BackendNotifier>,
        metrics: Arc<PubSubMetrics>,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            notifier,
            metrics,
            period,
        }
    }

    /// Runs the reap loop until the shutdown signal flips.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("janitor shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// One reap pass: remove empty records, then report the batch.
    pub async fn sweep(&self) {
        let reaped = self.registry.reap_empty().await;
        if reaped.is_empty() {
            return;
        }

        self.metrics
            .topics_reaped
            .fetch_add(reaped.len() as u64, Ordering::Relaxed);
        debug!(count = reaped.len(), "reaped empty topic records");

        if let Err(e) = self.notifier.topics_reaped(&reaped).await {
            warn!(error = %e, "failed to report reaped topics");
        }
    }
}
