//! WebSocket endpoint hosting the pairing engine.
//!
//! # Example
//!
//! ```no_run
//! use pairchat::ChatServer;
//!
//! # async fn example() -> pairchat::Result<()> {
//! let server = ChatServer::builder()
//!     .port(8080)
//!     .allow_origin("https://chat.example")
//!     .bind()
//!     .await?;
//!
//! println!("Listening on {}", server.ws_url());
//! tokio::signal::ctrl_c().await?;
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for server configuration.
pub mod builder;

/// Accept loop and handshake policy.
pub mod core;

/// Server options and JSON loading.
pub mod options;

/// Handshake origin policy.
pub mod origin;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{ChatServer, SESSION_HEADER, SESSION_PARAM};
pub use builder::ServerBuilder;
pub use options::ServerOptions;
pub use origin::OriginPolicy;
