//! Pairing engine: event handlers over the shared state store.
//!
//! # Connection Lifecycle
//!
//! ```text
//! absent ──connect──► waiting ──match──► paired ──disconnect──► remembered ──► absent
//!    │                                     ▲                        │
//!    └──────────────connect (partner still open)────────────────────┘
//! ```
//!
//! Each handler takes the state lock once and holds it for the whole
//! compound operation. Transport commands issued under the lock only queue
//! work, they never block.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::identifiers::ConnectionId;
use crate::transport::{CloseReason, Transport};

use super::notice;
use super::options::EngineOptions;
use super::state::{PairingState, Remembered};

// ============================================================================
// EngineStats
// ============================================================================

/// Point-in-time sizes of the engine's structures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Connections waiting for a partner.
    pub waiting: usize,
    /// Active pairs.
    pub pairs: usize,
    /// Broken pairs eligible for reconnection.
    pub remembered: usize,
}

// ============================================================================
// PairingEngine
// ============================================================================

/// Pairs connections, relays between partners, and restores broken pairs.
///
/// Purely reactive: it owns no tasks and is driven entirely by the
/// `on_*` handlers. None of the handlers fail; stale connections and failed
/// sends are logged and recovered locally.
///
/// # Example
///
/// ```ignore
/// let engine = PairingEngine::new(Arc::clone(&registry), EngineOptions::default());
///
/// engine.on_connect(a);
/// engine.on_connect(b); // a and b are now paired
/// engine.on_message(a, "hi"); // delivered to b
/// engine.on_disconnect(a, &CloseReason::Remote); // b notified and closed
/// ```
pub struct PairingEngine<T: Transport> {
    /// Outbound command sink.
    transport: Arc<T>,
    /// Behaviour options.
    options: EngineOptions,
    /// Queue, pairs and history.
    state: Mutex<PairingState>,
}

impl<T: Transport> fmt::Debug for PairingEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingEngine")
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PairingEngine - Constructor
// ============================================================================

impl<T: Transport> PairingEngine<T> {
    /// Creates an engine issuing commands through `transport`.
    #[must_use]
    pub fn new(transport: Arc<T>, options: EngineOptions) -> Self {
        Self {
            transport,
            options,
            state: Mutex::new(PairingState::default()),
        }
    }

    /// Returns the engine options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
}

// ============================================================================
// PairingEngine - Event Handlers
// ============================================================================

impl<T: Transport> PairingEngine<T> {
    /// Handles a new connection.
    ///
    /// Restores the previous pair if the remembered partner is still open,
    /// otherwise queues `id` and pairs waiters in arrival order.
    pub fn on_connect(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        self.expire(&mut state, Instant::now());

        if state.is_active(id) {
            warn!(connection_id = %id, "Duplicate connect ignored");
            return;
        }

        if !self.try_reconnect(&mut state, id) {
            state.waiting.push_back(id);
            debug!(connection_id = %id, waiting = state.waiting.len(), "Connection queued");
            self.match_waiting(&mut state);
        }

        Self::check(&state);
    }

    /// Relays `text` verbatim to the partner of `id`.
    ///
    /// If there is no open partner, or the forward fails, `id` gets the
    /// disconnect notice instead.
    pub fn on_message(&self, id: ConnectionId, text: &str) {
        let state = self.state.lock();

        let delivered = match state.pairs.partner_of(id) {
            Some(partner) if self.transport.is_open(partner) => {
                match self.transport.send(partner, text) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(connection_id = %id, partner = %partner, error = %e, "Relay failed");
                        false
                    }
                }
            }
            Some(partner) => {
                debug!(connection_id = %id, partner = %partner, "Partner no longer open");
                false
            }
            None => false,
        };

        if !delivered {
            self.notify(id, notice::PARTNER_DISCONNECTED);
        }
    }

    /// Handles a connection going away.
    ///
    /// A paired connection's partner is notified and, by default, closed;
    /// the broken pair is remembered for reconnection. Calling this twice
    /// for the same id has no further effect.
    pub fn on_disconnect(&self, id: ConnectionId, reason: &CloseReason) {
        let mut state = self.state.lock();
        self.expire(&mut state, Instant::now());

        if state.remove_waiting(id) {
            debug!(connection_id = %id, "Removed from waiting queue");
        }

        match state.pairs.unlink(id) {
            Some(pair) => {
                let partner = pair.other(id);
                state.history.remember(Remembered {
                    departed: id,
                    partner,
                    expires_at: self.expiry_from(Instant::now()),
                });

                info!(connection_id = %id, partner = %partner, %reason, "Pair broken");

                self.notify(partner, notice::PARTNER_DISCONNECTED);
                if self.options.close_orphaned_partner {
                    self.transport.close(partner, notice::CLOSE_PARTNER_LEFT);
                }
            }
            None => {
                // The remembered partner leaving invalidates the record.
                if let Some(record) = state.history.forget_partner(id) {
                    debug!(
                        connection_id = %id,
                        departed = %record.departed,
                        "Reconnect record invalidated"
                    );
                }
                debug!(connection_id = %id, %reason, "Unpaired connection left");
            }
        }

        Self::check(&state);
    }

    /// Drops expired reconnect records, closing any orphan left behind.
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let purged = self.expire(&mut state, Instant::now());
        Self::check(&state);
        purged
    }
}

// ============================================================================
// PairingEngine - Introspection
// ============================================================================

impl<T: Transport> PairingEngine<T> {
    /// Returns current structure sizes.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            waiting: state.waiting.len(),
            pairs: state.pairs.len(),
            remembered: state.history.len(),
        }
    }

    /// Returns the active partner of `id`.
    #[must_use]
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.state.lock().pairs.partner_of(id)
    }

    /// Returns `true` if `id` is waiting for a partner.
    #[must_use]
    pub fn is_waiting(&self, id: ConnectionId) -> bool {
        self.state.lock().is_waiting(id)
    }

    /// Returns `true` if `id` is waiting or paired.
    ///
    /// An id stays tracked until its disconnect has been handled.
    #[must_use]
    pub fn is_tracked(&self, id: ConnectionId) -> bool {
        self.state.lock().is_active(id)
    }

    /// Returns the counterpart `id` could be restored to.
    #[must_use]
    pub fn remembered_partner(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.state.lock().history.find(id).map(|record| record.other(id))
    }
}

// ============================================================================
// PairingEngine - Internals
// ============================================================================

impl<T: Transport> PairingEngine<T> {
    /// Restores `id` to its remembered partner, if possible.
    fn try_reconnect(&self, state: &mut PairingState, id: ConnectionId) -> bool {
        let Some(record) = state.history.find(id) else {
            return false;
        };
        let partner = record.other(id);

        if !self.transport.is_open(partner) || state.pairs.contains(partner) {
            state.history.forget(id);
            debug!(connection_id = %id, partner = %partner, "Stale reconnect record dropped");
            return false;
        }

        state.history.forget(id);
        state.remove_waiting(partner);
        state.pairs.link(id, partner);

        info!(connection_id = %id, partner = %partner, "Pair restored");

        self.notify(id, notice::RECONNECTED);
        self.notify(partner, notice::PARTNER_RECONNECTED);
        true
    }

    /// Pairs waiters two at a time, oldest first.
    fn match_waiting(&self, state: &mut PairingState) {
        while state.waiting.len() >= 2 {
            let Some(first) = self.pop_live_waiter(state) else {
                continue;
            };
            let Some(second) = self.pop_live_waiter(state) else {
                state.waiting.push_front(first);
                continue;
            };

            state.history.forget(first);
            state.history.forget(second);
            state.pairs.link(first, second);

            info!(first = %first, second = %second, "Connections paired");

            self.notify(first, notice::PAIRED);
            self.notify(second, notice::PAIRED);
        }
    }

    /// Pops the queue head, discarding it if the transport says it is gone.
    fn pop_live_waiter(&self, state: &mut PairingState) -> Option<ConnectionId> {
        let id = state.waiting.pop_front()?;
        if self.transport.is_open(id) {
            Some(id)
        } else {
            debug!(connection_id = %id, "Dropping stale waiter");
            None
        }
    }

    /// Purges expired records and closes orphans they leave behind.
    fn expire(&self, state: &mut PairingState, now: Instant) -> usize {
        let expired = state.history.take_expired(now);

        for record in &expired {
            let partner = record.partner;
            let orphaned = !state.is_active(partner) && self.transport.is_open(partner);

            debug!(departed = %record.departed, partner = %partner, orphaned, "Reconnect window expired");

            if orphaned {
                self.transport.close(partner, notice::CLOSE_WINDOW_EXPIRED);
            }
        }

        expired.len()
    }

    /// Deadline for a record made at `now`.
    ///
    /// A window too large to represent never expires.
    fn expiry_from(&self, now: Instant) -> Option<Instant> {
        self.options
            .reconnect_window
            .and_then(|window| now.checked_add(window))
    }

    /// Sends a notice; failure is logged and otherwise ignored.
    fn notify(&self, id: ConnectionId, text: &str) {
        if let Err(e) = self.transport.send(id, text) {
            warn!(connection_id = %id, error = %e, "Failed to deliver notice");
        }
    }

    #[inline]
    fn check(state: &PairingState) {
        if cfg!(debug_assertions) {
            state.assert_invariants();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
