//! Pairing engine options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pairchat::EngineOptions;
//!
//! let options = EngineOptions::new()
//!     .with_reconnect_window(Duration::from_secs(30))
//!     .with_orphaned_partner_kept();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// How long a broken pair is remembered by default.
pub const DEFAULT_RECONNECT_WINDOW: Duration = Duration::from_secs(60);

// ============================================================================
// EngineOptions
// ============================================================================

/// Behaviour knobs for the pairing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// How long a broken pair stays eligible for reconnection.
    ///
    /// `None` keeps records until one side's disconnect invalidates them.
    #[serde(rename = "reconnect_window_secs", with = "window_secs")]
    pub reconnect_window: Option<Duration>,

    /// Close the remaining side when its partner disconnects.
    ///
    /// When `false` the remaining side stays open, unpaired, until its
    /// partner returns or the reconnect window expires.
    pub close_orphaned_partner: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl EngineOptions {
    /// Creates options with the default window and closing behaviour.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reconnect_window: Some(DEFAULT_RECONNECT_WINDOW),
            close_orphaned_partner: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl EngineOptions {
    /// Sets the reconnect window.
    #[inline]
    #[must_use]
    pub fn with_reconnect_window(mut self, window: Duration) -> Self {
        self.reconnect_window = Some(window);
        self
    }

    /// Remembers broken pairs until invalidated, with no expiry.
    #[inline]
    #[must_use]
    pub fn without_reconnect_expiry(mut self) -> Self {
        self.reconnect_window = None;
        self
    }

    /// Leaves the remaining side open when its partner disconnects.
    #[inline]
    #[must_use]
    pub fn with_orphaned_partner_kept(mut self) -> Self {
        self.close_orphaned_partner = false;
        self
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// `Option<Duration>` as whole seconds, rounding sub-second parts up.
mod window_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        window: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        window
            .map(|d| d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0)))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
