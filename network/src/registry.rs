//! Connection registry: maps identities to their live RPC channels.
//!
//! Shared between the WebSocket accept path (which registers and removes
//! channels) and the request handlers (which look channels up).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use bridge_types::Identity;

use crate::{ChannelError, RpcChannel};

/// Registry handle shared across tasks.
pub type SharedRegistry = Arc<RwLock<ConnectionRegistry>>;

/// At most one channel per identity.
pub struct ConnectionRegistry {
    connections: HashMap<Identity, Arc<RpcChannel>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Create an empty registry wrapped for sharing.
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Register a channel under its identity. A channel already registered
    /// for that identity is closed and returned.
    pub fn register(&mut self, channel: Arc<RpcChannel>) -> Option<Arc<RpcChannel>> {
        let identity = channel.identity().clone();
        let previous = self.connections.insert(identity.clone(), channel);
        if let Some(old) = &previous {
            tracing::info!(
                identity = %identity,
                superseded = old.id(),
                "replacing existing connection"
            );
            old.close();
        }
        previous
    }

    /// Look up the channel for an identity.
    pub fn lookup(&self, identity: &Identity) -> Result<Arc<RpcChannel>, ChannelError> {
        self.connections
            .get(identity)
            .cloned()
            .ok_or_else(|| ChannelError::NotConnected(identity.clone()))
    }

    /// Remove an identity's channel, returning it if present.
    pub fn remove(&mut self, identity: &Identity) -> Option<Arc<RpcChannel>> {
        self.connections.remove(identity)
    }

    /// Remove the entry only if it still holds the channel with `channel_id`.
    ///
    /// A connection that was superseded must not evict its replacement when
    /// it shuts down.
    pub fn remove_if_current(&mut self, identity: &Identity, channel_id: u64) -> bool {
        match self.connections.get(identity) {
            Some(current) if current.id() == channel_id => {
                self.connections.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// All registered identities, sorted.
    pub fn list(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.connections.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close and remove every channel. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.len();
        for (_, channel) in self.connections.drain() {
            channel.close();
        }
        count
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
