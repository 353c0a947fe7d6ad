//! pairchat - anonymous two-party WebSocket chat.
//!
//! Clients connect to a WebSocket endpoint, wait in a queue, and are paired
//! with the next client to arrive. Text sent by one side is relayed verbatim
//! to the other. When one side drops, its partner is told and the broken pair
//! is remembered for a while, so the departed side can be restored to the
//! same partner if it comes back in time.
//!
//! # Architecture
//!
//! The crate is split along one seam:
//!
//! - **Pairing engine**: waiting queue, pair registry, partner history and
//!   the connect/message/disconnect transitions over them
//! - **Transport**: anything implementing [`Transport`]; the bundled one is
//!   a tokio-tungstenite server
//!
//! Key design principles:
//!
//! - One lock around all engine state; every handler is one critical section
//! - Handlers never fail; stale connections fall back to a notice
//! - Pairing is strict arrival order
//! - No background tasks in the engine
//!
//! # Quick Start
//!
//! ```no_run
//! use pairchat::{ChatServer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = ChatServer::builder().port(8080).bind().await?;
//!     println!("Chat endpoint: {}", server.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | [`PairingEngine`] and its options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`ConnectionId`] |
//! | [`server`] | [`ChatServer`] WebSocket endpoint |
//! | [`transport`] | [`Transport`] seam and WebSocket connections |

// ============================================================================
// Modules
// ============================================================================

/// Pairing engine.
///
/// The core state machine: queue, pairs, reconnection memory.
pub mod engine;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket endpoint hosting the engine.
pub mod server;

/// Transport seam and WebSocket connections.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{EngineOptions, EngineStats, PairingEngine, notice};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Server types
pub use server::{ChatServer, OriginPolicy, SESSION_HEADER, SESSION_PARAM, ServerBuilder, ServerOptions};

// Transport types
pub use transport::{CloseReason, ConnectionRegistry, Transport};
