//! Pairing state store.
//!
//! The three structures the engine coordinates:
//!
//! | Structure | Holds |
//! |-----------|-------|
//! | waiting queue | unpaired connections, arrival order |
//! | [`PairRegistry`] | active pairs |
//! | [`PartnerHistory`] | broken pairs eligible for reconnection |
//!
//! Both relations are stored as one record indexed under each member, so
//! neither direction can be updated without the other.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tokio::time::Instant;

use crate::identifiers::ConnectionId;

// ============================================================================
// Pair
// ============================================================================

/// An active two-party session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    a: ConnectionId,
    b: ConnectionId,
}

impl Pair {
    fn new(a: ConnectionId, b: ConnectionId) -> Self {
        assert_ne!(a, b, "a connection cannot be paired with itself");
        Self { a, b }
    }

    /// Returns the member that is not `id`.
    #[inline]
    #[must_use]
    pub fn other(&self, id: ConnectionId) -> ConnectionId {
        if self.a == id { self.b } else { self.a }
    }
}

// ============================================================================
// PairRegistry
// ============================================================================

/// Symmetric relation of active pairs.
#[derive(Debug, Default)]
pub struct PairRegistry {
    by_member: FxHashMap<ConnectionId, Pair>,
}

impl PairRegistry {
    /// Links two unpaired connections.
    pub fn link(&mut self, a: ConnectionId, b: ConnectionId) -> Pair {
        debug_assert!(!self.contains(a) && !self.contains(b), "already paired");

        let pair = Pair::new(a, b);
        self.by_member.insert(a, pair);
        self.by_member.insert(b, pair);
        pair
    }

    /// Removes the pair containing `id` in both directions.
    pub fn unlink(&mut self, id: ConnectionId) -> Option<Pair> {
        let pair = self.by_member.remove(&id)?;
        self.by_member.remove(&pair.other(id));
        Some(pair)
    }

    #[inline]
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.by_member.get(&id).map(|pair| pair.other(id))
    }

    #[inline]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.by_member.contains_key(&id)
    }

    /// Number of pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_member.len() / 2
    }

    fn members(&self) -> impl Iterator<Item = (&ConnectionId, &Pair)> {
        self.by_member.iter()
    }
}

// ============================================================================
// Remembered
// ============================================================================

/// A pair broken by `departed` leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remembered {
    /// The side that disconnected.
    pub departed: ConnectionId,
    /// The side that was left behind.
    pub partner: ConnectionId,
    /// When the record stops being eligible, if ever.
    pub expires_at: Option<Instant>,
}

impl Remembered {
    /// Returns the member that is not `id`.
    #[inline]
    #[must_use]
    pub fn other(&self, id: ConnectionId) -> ConnectionId {
        if self.departed == id { self.partner } else { self.departed }
    }

    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// ============================================================================
// PartnerHistory
// ============================================================================

/// Broken pairs, looked up from either side.
///
/// A connection appears in at most one record.
#[derive(Debug, Default)]
pub struct PartnerHistory {
    by_member: FxHashMap<ConnectionId, Remembered>,
}

impl PartnerHistory {
    /// Stores a record, replacing any record either member was part of.
    pub fn remember(&mut self, record: Remembered) {
        self.forget(record.departed);
        self.forget(record.partner);
        self.by_member.insert(record.departed, record);
        self.by_member.insert(record.partner, record);
    }

    /// Returns the record `id` is part of, from either side.
    #[inline]
    pub fn find(&self, id: ConnectionId) -> Option<Remembered> {
        self.by_member.get(&id).copied()
    }

    /// Removes the record `id` is part of.
    pub fn forget(&mut self, id: ConnectionId) -> Option<Remembered> {
        let record = self.by_member.remove(&id)?;
        self.by_member.remove(&record.other(id));
        Some(record)
    }

    /// Removes the record only if `id` is its remembered partner.
    pub fn forget_partner(&mut self, id: ConnectionId) -> Option<Remembered> {
        match self.by_member.get(&id) {
            Some(record) if record.partner == id => self.forget(id),
            _ => None,
        }
    }

    /// Removes and returns every record expired at `now`.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Remembered> {
        let expired: Vec<Remembered> = self
            .by_member
            .iter()
            .filter(|(id, record)| **id == record.departed && record.is_expired(now))
            .map(|(_, record)| *record)
            .collect();

        for record in &expired {
            self.forget(record.departed);
        }

        expired
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_member.len() / 2
    }

    fn members(&self) -> impl Iterator<Item = &ConnectionId> {
        self.by_member.keys()
    }
}

// ============================================================================
// PairingState
// ============================================================================

/// Everything the engine mutates, behind one lock.
#[derive(Debug, Default)]
pub struct PairingState {
    pub waiting: VecDeque<ConnectionId>,
    pub pairs: PairRegistry,
    pub history: PartnerHistory,
}

impl PairingState {
    #[inline]
    pub fn is_waiting(&self, id: ConnectionId) -> bool {
        self.waiting.contains(&id)
    }

    /// Returns `true` if `id` is waiting or paired.
    #[inline]
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.pairs.contains(id) || self.is_waiting(id)
    }

    /// Removes `id` from the waiting queue, returning whether it was there.
    pub fn remove_waiting(&mut self, id: ConnectionId) -> bool {
        match self.waiting.iter().position(|w| *w == id) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Panics if the structures disagree with each other.
    pub fn assert_invariants(&self) {
        for (i, id) in self.waiting.iter().enumerate() {
            assert!(!self.pairs.contains(*id), "{id} is both waiting and paired");
            assert!(
                !self.waiting.iter().skip(i + 1).any(|other| other == id),
                "{id} is queued twice"
            );
        }

        for (id, pair) in self.pairs.members() {
            let partner = pair.other(*id);
            assert_eq!(
                self.pairs.partner_of(partner),
                Some(*id),
                "pair {id} -> {partner} is not symmetric"
            );
        }
        assert_eq!(self.pairs.by_member.len() % 2, 0, "odd pair registry");

        for id in self.history.members() {
            assert!(!self.pairs.contains(*id), "remembered {id} is paired");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn ids<const N: usize>() -> [ConnectionId; N] {
        std::array::from_fn(|_| ConnectionId::new())
    }

    #[test]
    fn test_link_is_symmetric() {
        let [a, b] = ids();
        let mut pairs = PairRegistry::default();
        pairs.link(a, b);

        assert_eq!(pairs.partner_of(a), Some(b));
        assert_eq!(pairs.partner_of(b), Some(a));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_unlink_from_either_side() {
        let [a, b] = ids();
        let mut pairs = PairRegistry::default();
        pairs.link(a, b);

        let pair = pairs.unlink(b).expect("paired");
        assert_eq!(pair.other(b), a);
        assert!(!pairs.contains(a));
        assert!(!pairs.contains(b));
        assert!(pairs.unlink(a).is_none());
    }

    #[test]
    #[should_panic(expected = "paired with itself")]
    fn test_self_pair_panics() {
        let [a] = ids();
        PairRegistry::default().link(a, a);
    }

    #[test]
    fn test_history_lookup_from_both_sides() {
        let [a, b] = ids();
        let mut history = PartnerHistory::default();
        history.remember(Remembered {
            departed: a,
            partner: b,
            expires_at: None,
        });

        assert_eq!(history.find(a).map(|r| r.other(a)), Some(b));
        assert_eq!(history.find(b).map(|r| r.other(b)), Some(a));
        assert_eq!(history.len(), 1);

        history.forget(b);
        assert!(history.find(a).is_none());
        assert!(history.find(b).is_none());
    }

    #[test]
    fn test_forget_partner_only_matches_partner_side() {
        let [a, b] = ids();
        let mut history = PartnerHistory::default();
        history.remember(Remembered {
            departed: a,
            partner: b,
            expires_at: None,
        });

        assert!(history.forget_partner(a).is_none());
        assert!(history.find(a).is_some());

        assert!(history.forget_partner(b).is_some());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_remember_replaces_overlapping_record() {
        let [a, b, c] = ids();
        let mut history = PartnerHistory::default();
        history.remember(Remembered {
            departed: a,
            partner: b,
            expires_at: None,
        });
        history.remember(Remembered {
            departed: c,
            partner: b,
            expires_at: None,
        });

        assert!(history.find(a).is_none());
        assert_eq!(history.find(b).map(|r| r.departed), Some(c));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_take_expired() {
        let [a, b, c, d] = ids();
        let now = Instant::now();
        let mut history = PartnerHistory::default();
        history.remember(Remembered {
            departed: a,
            partner: b,
            expires_at: Some(now + Duration::from_secs(1)),
        });
        history.remember(Remembered {
            departed: c,
            partner: d,
            expires_at: None,
        });

        assert!(history.take_expired(now).is_empty());

        let expired = history.take_expired(now + Duration::from_secs(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].departed, a);
        assert!(history.find(b).is_none());
        assert!(history.find(c).is_some());
    }

    #[test]
    fn test_remove_waiting() {
        let [a, b] = ids();
        let mut state = PairingState::default();
        state.waiting.push_back(a);

        assert!(state.is_active(a));
        assert!(state.remove_waiting(a));
        assert!(!state.remove_waiting(a));
        assert!(!state.remove_waiting(b));
    }

    #[test]
    #[should_panic(expected = "both waiting and paired")]
    fn test_invariant_waiting_and_paired() {
        let [a, b] = ids();
        let mut state = PairingState::default();
        state.pairs.link(a, b);
        state.waiting.push_back(a);
        state.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "is paired")]
    fn test_invariant_remembered_and_paired() {
        let [a, b, c] = ids();
        let mut state = PairingState::default();
        state.history.remember(Remembered {
            departed: a,
            partner: b,
            expires_at: None,
        });
        state.pairs.link(b, c);
        state.assert_invariants();
    }
}
