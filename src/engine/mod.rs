//! Pairing engine.
//!
//! Matches waiting connections two at a time in arrival order, relays text
//! between partners, and restores a broken pair when the departed side comes
//! back while its partner is still open.
//!
//! # State
//!
//! | Structure | Role |
//! |-----------|------|
//! | waiting queue | FIFO of unpaired connections |
//! | pair registry | symmetric active pairs |
//! | partner history | broken pairs, found from either side, with expiry |
//!
//! A connection is in at most one of these at a time. All three live behind
//! one lock; see [`PairingEngine`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`PairingEngine`] and its event handlers |
//! | `notice` | Canned texts sent to clients |
//! | `options` | [`EngineOptions`] |
//! | `state` | Queue, pair and history structures |

// ============================================================================
// Submodules
// ============================================================================

/// Engine and event handlers.
pub mod core;

/// Canned notices.
pub mod notice;

/// Engine options.
pub mod options;

/// Internal state store.
mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{EngineStats, PairingEngine};
pub use options::{DEFAULT_RECONNECT_WINDOW, EngineOptions};
