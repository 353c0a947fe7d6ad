//! Canned notices sent to clients.
//!
//! These are the only texts the engine ever originates; everything else on
//! the wire is relayed client payload.

/// Sent to both sides when two waiters are paired.
pub const PAIRED: &str = "Connected with a random user.";

/// Sent to the side that came back and was restored to its partner.
pub const RECONNECTED: &str = "Reconnected with your previous chat partner!";

/// Sent to the partner that was waiting for the other side to come back.
pub const PARTNER_RECONNECTED: &str = "Your previous chat partner has reconnected!";

/// Sent when the partner is gone, or a message had nowhere to go.
pub const PARTNER_DISCONNECTED: &str = "The person you were talking to has disconnected.";

/// Close reason for the remaining side of a broken pair.
pub(crate) const CLOSE_PARTNER_LEFT: &str = "partner disconnected";

/// Close reason for an orphan whose partner never came back.
pub(crate) const CLOSE_WINDOW_EXPIRED: &str = "reconnect window expired";
