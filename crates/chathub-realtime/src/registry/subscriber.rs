//! Subscriber endpoints and the locked member lists they live in.

use tokio::sync::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::wire::WireMessage;

/// Unique identity of one delivery endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EndpointId(pub Uuid);

impl EndpointId {
    /// Creates a new random endpoint ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write-only delivery handle for one client session.
///
/// The session owns the receiving half for its whole lifetime; everything
/// held by the registry is an identity handle that the session withdraws on
/// teardown. Equality and hashing go by [`EndpointId`] alone.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Identity of this endpoint.
    pub id: EndpointId,
    /// Bounded outbox towards the session's writer.
    tx: mpsc::Sender<WireMessage>,
}

impl Endpoint {
    /// Creates an endpoint plus the receiver half the owning session keeps.
    pub fn new(outbox_capacity: usize) -> (Self, mpsc::Receiver<WireMessage>) {
        let (tx, rx) = mpsc::channel(outbox_capacity);
        (
            Self {
                id: EndpointId::new(),
                tx,
            },
            rx,
        )
    }

    /// Enqueue a message, waiting until the outbox accepts it or is closed.
    ///
    /// Returns `Err` once the owning session has closed the receiving half.
    pub async fn send(&self, msg: WireMessage) -> Result<(), WireMessage> {
        self.tx.send(msg).await.map_err(|e| e.0)
    }

    /// Whether the owning session has already closed the receiving half.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Endpoint {}

impl std::hash::Hash for Endpoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An unordered set of subscriber endpoints guarded by a reader-writer lock.
///
/// Membership never contains the same endpoint twice.
#[derive(Debug, Default)]
pub struct SubscriberSet {
    members: RwLock<Vec<Endpoint>>,
}

impl SubscriberSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set already holding one member.
    ///
    /// Topic records are born through this so the janitor can never observe
    /// a freshly created record empty.
    pub fn with_member(endpoint: Endpoint) -> Self {
        Self {
            members: RwLock::new(vec![endpoint]),
        }
    }

    /// Adds an endpoint unless it is already a member.
    pub async fn add(&self, endpoint: &Endpoint) {
        let mut members = self.members.write().await;
        if !members.iter().any(|m| m.id == endpoint.id) {
            members.push(endpoint.clone());
        }
    }

    /// Removes an endpoint if present.
    pub async fn remove(&self, id: EndpointId) {
        let mut members = self.members.write().await;
        members.retain(|m| m.id != id);
    }

    /// Snapshot of the current members.
    pub async fn snapshot(&self) -> Vec<Endpoint> {
        self.members.read().await.clone()
    }

    /// Whether the set has no members.
    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    /// Current member count.
    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    /// Removes every member.
    pub async fn clear(&self) {
        self.members.write().await.clear();
    }
}
