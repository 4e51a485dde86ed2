use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod session;

pub use events::{WsInboundEvent, WsOutboundEvent};

/// Unique identifier for a live WebSocket connection.
///
/// Assigned when a connection joins the registry; used for precise cleanup
/// when it closes, without knowing which user it was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

#[derive(Default)]
struct RegistryInner {
    // user_id -> live connections (one user may hold several; multi-device)
    channels: HashMap<Uuid, Vec<Connection>>,
    // connection -> owning user, so leave() needs no user id
    owners: HashMap<ConnectionId, Uuid>,
}

impl RegistryInner {
    fn detach(&mut self, connection_id: ConnectionId) {
        if let Some(user_id) = self.owners.remove(&connection_id) {
            if let Some(connections) = self.channels.get_mut(&user_id) {
                connections.retain(|c| c.id != connection_id);
                if connections.is_empty() {
                    self.channels.remove(&user_id);
                }
            }
        }
    }
}

/// Registry of live connections per user, shared across the whole process.
///
/// Delivery through it is strictly best-effort: with no live connection the
/// event is dropped, and the durable message log remains the ground truth.
/// The notify path only takes the shared read lock; dead senders found while
/// fanning out are pruned afterwards under the write lock.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection under `user_id`.
    ///
    /// Returns the connection id (for `leave`) and the channel the caller
    /// must drain into the socket.
    pub async fn join(&self, user_id: Uuid) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let connection_id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        guard.owners.insert(connection_id, user_id);
        guard.channels.entry(user_id).or_default().push(Connection {
            id: connection_id,
            sender: tx,
        });

        tracing::debug!(
            %user_id,
            connections = guard.channels.get(&user_id).map(|v| v.len()).unwrap_or(0),
            "connection joined"
        );

        (connection_id, rx)
    }

    /// Removes a connection from whichever user holds it. Unknown ids are a
    /// no-op.
    pub async fn leave(&self, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        guard.detach(connection_id);
    }

    /// Delivers `payload` to every live connection of `user_id` and returns
    /// how many received it. Zero means the event was dropped.
    pub async fn notify(&self, user_id: Uuid, payload: &str) -> usize {
        let mut dead: Vec<ConnectionId> = Vec::new();
        let delivered = {
            let guard = self.inner.read().await;
            match guard.channels.get(&user_id) {
                Some(connections) => connections
                    .iter()
                    .filter(|c| {
                        if c.sender.send(payload.to_string()).is_ok() {
                            true
                        } else {
                            dead.push(c.id);
                            false
                        }
                    })
                    .count(),
                None => 0,
            }
        };

        if !dead.is_empty() {
            let mut guard = self.inner.write().await;
            for id in dead {
                guard.detach(id);
            }
        }

        delivered
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.channels.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }
}
