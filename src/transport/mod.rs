//! WebSocket transport layer.
//!
//! This module defines the [`Transport`] seam the pairing engine talks
//! through, and the WebSocket implementation of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  text frames  ┌──────────────┐ Transport ┌───────────────┐
//! │ client A │◄─────────────►│ Connection A │◄──────────┤               │
//! └──────────┘               └──────────────┘           │ PairingEngine │
//! ┌──────────┐  text frames  ┌──────────────┐           │               │
//! │ client B │◄─────────────►│ Connection B │◄──────────┤               │
//! └──────────┘               └──────────────┘           └───────────────┘
//!                         (ConnectionRegistry)
//! ```
//!
//! Every outbound operation is a non-blocking push onto a connection's
//! command channel, so the engine can issue them while holding its lock.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-client WebSocket connection and event loop |
//! | `registry` | Live connections, implements [`Transport`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Result;
use crate::identifiers::ConnectionId;

// ============================================================================
// Submodules
// ============================================================================

/// Per-client WebSocket connection and event loop.
pub mod connection;

/// Registry of live connections.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, MessageHandler};
pub use registry::ConnectionRegistry;

// ============================================================================
// Transport
// ============================================================================

/// Outbound commands the pairing engine issues.
///
/// Implementations must not block and must not call back into the engine:
/// the engine invokes these while holding its state lock.
pub trait Transport: Send + Sync {
    /// Sends a text frame to a connection.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionNotFound`](crate::Error::ConnectionNotFound) if the id is unknown
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if it is closing
    fn send(&self, id: ConnectionId, text: &str) -> Result<()>;

    /// Requests teardown of a connection.
    fn close(&self, id: ConnectionId, reason: &str);

    /// Returns `true` if the connection is live and not closing.
    fn is_open(&self, id: ConnectionId) -> bool;
}

// ============================================================================
// CloseReason
// ============================================================================

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame.
    Remote,
    /// The server closed it (e.g. partner left, shutdown).
    Local(String),
    /// The stream failed.
    Error(String),
    /// The stream ended without a close frame.
    Ended,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("closed by client"),
            Self::Local(reason) => write!(f, "closed by server: {reason}"),
            Self::Error(message) => write!(f, "stream error: {message}"),
            Self::Ended => f.write_str("stream ended"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
