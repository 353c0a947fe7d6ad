//! Error types for pairchat.
//!
//! This module defines all error types used throughout the crate.
//!
//! The pairing engine itself never returns errors to the transport: stale
//! references and failed sends are recovered locally. These errors surface
//! from the transport seam, the hosting server and option loading.
//!
//! # Usage
//!
//! ```ignore
//! use pairchat::{ChatServer, Result};
//!
//! async fn example() -> Result<()> {
//!     let server = ChatServer::builder().port(8080).bind().await?;
//!     println!("{}", server.ws_url());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidSessionId`] |
//! | Connection | [`Error::Handshake`], [`Error::ConnectionClosed`], [`Error::ConnectionNotFound`], [`Error::DuplicateConnection`] |
//! | Policy | [`Error::OriginRejected`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server or engine options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A presented session id could not be parsed.
    #[error("Invalid session id: {value}")]
    InvalidSessionId {
        /// The rejected input.
        value: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket upgrade failed or was refused.
    #[error("Handshake failed: {message}")]
    Handshake {
        /// Description of the handshake failure.
        message: String,
    },

    /// The connection exists but is closing or closed.
    ///
    /// This is the stale-reference case: callers fall back instead of failing.
    #[error("Connection closed: {connection_id}")]
    ConnectionClosed {
        /// The closed connection.
        connection_id: ConnectionId,
    },

    /// No live connection with this id.
    #[error("Connection not found: {connection_id}")]
    ConnectionNotFound {
        /// The unknown connection.
        connection_id: ConnectionId,
    },

    /// A connection with this id is already registered.
    #[error("Connection already registered: {connection_id}")]
    DuplicateConnection {
        /// The conflicting connection id.
        connection_id: ConnectionId,
    },

    // ========================================================================
    // Policy Errors
    // ========================================================================
    /// The handshake `Origin` header is not allowed.
    #[error("Origin rejected: {origin}")]
    OriginRejected {
        /// The offending origin.
        origin: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid session id error.
    #[inline]
    pub fn invalid_session_id(value: impl Into<String>) -> Self {
        Self::InvalidSessionId {
            value: value.into(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates a connection closed error.
    #[inline]
    pub fn connection_closed(connection_id: ConnectionId) -> Self {
        Self::ConnectionClosed { connection_id }
    }

    /// Creates a connection not found error.
    #[inline]
    pub fn connection_not_found(connection_id: ConnectionId) -> Self {
        Self::ConnectionNotFound { connection_id }
    }

    /// Creates a duplicate connection error.
    #[inline]
    pub fn duplicate_connection(connection_id: ConnectionId) -> Self {
        Self::DuplicateConnection { connection_id }
    }

    /// Creates an origin rejected error.
    #[inline]
    pub fn origin_rejected(origin: impl Into<String>) -> Self {
        Self::OriginRejected {
            origin: origin.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Handshake { .. }
                | Self::ConnectionClosed { .. }
                | Self::ConnectionNotFound { .. }
                | Self::DuplicateConnection { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the error refers to a connection that is gone.
    ///
    /// The engine answers these with the "partner disconnected" notice.
    #[inline]
    #[must_use]
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed { .. } | Self::ConnectionNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
