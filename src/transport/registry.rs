//! Registry of live WebSocket connections.
//!
//! Every accepted client is registered here under its [`ConnectionId`] for
//! the lifetime of its event loop. The registry is the production
//! [`Transport`]: engine commands are routed to connections by id.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         ConnectionRegistry              │
//! │  ┌─────────────────────────────────┐    │
//! │  │ ConnectionId(a1f…) → Connection │    │
//! │  │ ConnectionId(07c…) → Connection │    │
//! │  │ ConnectionId(e95…) → Connection │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::{Connection, Transport};

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Live connections keyed by id.
///
/// Thread-safe. Lock scopes are short and never call out to other
/// components.
#[derive(Default)]
pub struct ConnectionRegistry {
    /// Active connections by id.
    connections: RwLock<FxHashMap<ConnectionId, Connection>>,
}

// ============================================================================
// ConnectionRegistry - Public API
// ============================================================================

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if no connection is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns `true` if a connection with this id is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    /// Registers a connection under its own id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateConnection`] if the id is taken.
    pub fn register(&self, connection: Connection) -> Result<()> {
        let id = connection.id();
        let mut connections = self.connections.write();

        if connections.contains_key(&id) {
            return Err(Error::duplicate_connection(id));
        }

        connections.insert(id, connection);
        debug!(connection_id = %id, "Connection registered");
        Ok(())
    }

    /// Removes a connection, returning it if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.write().remove(&id);

        if removed.is_some() {
            debug!(connection_id = %id, "Connection removed from registry");
        }

        removed
    }

    /// Closes every registered connection.
    ///
    /// Entries stay registered until their event loops report the close.
    pub fn close_all(&self, reason: &str) -> usize {
        let connections: Vec<Connection> = self.connections.read().values().cloned().collect();

        for connection in &connections {
            connection.close(reason);
        }

        connections.len()
    }

    /// Looks up a connection handle.
    fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.read().get(&id).cloned()
    }
}

// ============================================================================
// ConnectionRegistry - Transport
// ============================================================================

impl Transport for ConnectionRegistry {
    fn send(&self, id: ConnectionId, text: &str) -> Result<()> {
        self.get(id)
            .ok_or_else(|| Error::connection_not_found(id))?
            .send(text)
    }

    fn close(&self, id: ConnectionId, reason: &str) {
        if let Some(connection) = self.get(id) {
            connection.close(reason);
        }
    }

    fn is_open(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .get(&id)
            .is_some_and(Connection::is_open)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unknown_connection_is_not_open() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.is_open(ConnectionId::new()));
    }

    #[test]
    fn test_send_to_unknown_connection() {
        let registry = ConnectionRegistry::new();
        let err = registry
            .send(ConnectionId::new(), "hello")
            .expect_err("unknown id");

        assert!(err.is_stale_reference());
        assert!(matches!(err, Error::ConnectionNotFound { .. }));
    }

    #[test]
    fn test_close_and_remove_unknown_are_noops() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();

        registry.close(id, "bye");
        assert!(registry.remove(id).is_none());
        assert_eq!(registry.close_all("shutdown"), 0);
    }
}
