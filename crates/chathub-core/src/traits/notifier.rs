//! Backend notifier trait for topic lifecycle announcements.

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for the backend collaborator that is told about topic lifecycle
/// events.
///
/// All notices are fire-and-forget from the caller's point of view: the
/// engine logs a failure and moves on, it never retries and never lets a
/// notifier error reach client-visible behavior.
#[async_trait]
pub trait BackendNotifier: Send + Sync + std::fmt::Debug + 'static {
    /// Announce that the server has started and is accepting connections.
    async fn startup(&self) -> AppResult<()>;

    /// Announce that a brand-new topic record was created by a first
    /// subscription.
    async fn new_topic(&self, topic: &str) -> AppResult<()>;

    /// Announce the batch of topic names the janitor reaped this tick.
    async fn topics_reaped(&self, topics: &[String]) -> AppResult<()>;
}
