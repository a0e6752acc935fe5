//! Append-only transition ledger.
//!
//! Every booking state change is recorded as a [`LedgerEntry`]. Entries are
//! never edited or removed, and per booking they always form a walk of the
//! lifecycle graph that starts at [`BookingState::Idle`]: each entry's `from`
//! is the previous entry's `to`, and sequence numbers count up from 1.
//!
//! The in-memory ledger caches what the repository persists. When another
//! process moved a booking, [`TransitionLedger::reconcile`] adopts the
//! persisted history before the next entry is appended.

use crate::types::{Actor, BookingId, BookingState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Booking that moved
    pub booking_id: BookingId,
    /// Position in the booking's history, starting at 1; assigned on append
    pub sequence: u64,
    /// State before
    pub from: BookingState,
    /// State after
    pub to: BookingState,
    /// Human-readable reason
    pub reason: String,
    /// Who caused it
    pub actor: Actor,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry not yet sequenced by a ledger.
    pub fn new(
        booking_id: BookingId,
        from: BookingState,
        to: BookingState,
        reason: impl Into<String>,
        actor: Actor,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            booking_id,
            sequence: 0,
            from,
            to,
            reason: reason.into(),
            actor,
            timestamp,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: Vec<LedgerEntry>,
    by_booking: HashMap<BookingId, Vec<usize>>,
}

impl LedgerInner {
    fn history(&self, booking_id: BookingId) -> Vec<LedgerEntry> {
        self.by_booking
            .get(&booking_id)
            .map(|indices| indices.iter().map(|&i| self.entries[i].clone()).collect())
            .unwrap_or_default()
    }

    fn last_state(&self, booking_id: BookingId) -> BookingState {
        self.by_booking
            .get(&booking_id)
            .and_then(|indices| indices.last())
            .map_or(BookingState::Idle, |&index| self.entries[index].to)
    }

    /// Store `entry` as the booking's next entry.
    fn push(&mut self, mut entry: LedgerEntry) -> LedgerEntry {
        let index = self.entries.len();
        let positions = self.by_booking.entry(entry.booking_id).or_default();
        positions.push(index);
        entry.sequence = positions.len() as u64;

        self.entries.push(entry.clone());
        entry
    }
}

/// In-memory, append-only record of every transition.
#[derive(Debug, Default)]
pub struct TransitionLedger {
    inner: RwLock<LedgerInner>,
}

impl TransitionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, assigning its sequence number.
    ///
    /// Returns the stored entry, or `None` when the entry is not a lifecycle
    /// edge or does not continue the booking's recorded history.
    pub fn append(&self, entry: LedgerEntry) -> Option<LedgerEntry> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if !entry.from.can_transition_to(entry.to) {
            tracing::error!(
                booking_id = %entry.booking_id,
                from = %entry.from,
                to = %entry.to,
                "Rejected ledger entry: not a lifecycle edge"
            );
            return None;
        }

        let last_state = inner.last_state(entry.booking_id);
        if entry.from != last_state {
            tracing::debug!(
                booking_id = %entry.booking_id,
                expected = %last_state,
                from = %entry.from,
                "Ledger entry does not continue the recorded history"
            );
            return None;
        }

        Some(inner.push(entry))
    }

    /// Append `entry` even though it does not continue the recorded history.
    ///
    /// Only for transitions that are already persisted while part of the
    /// booking's history was lost; the booking's walk has a gap afterwards.
    pub fn append_after_gap(&self, entry: LedgerEntry) -> LedgerEntry {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry)
    }

    /// Adopt `persisted` (one booking, oldest first) when it is a legal walk
    /// that extends what this ledger holds for `booking_id`. Returns the
    /// booking's history afterwards.
    pub fn reconcile(&self, booking_id: BookingId, persisted: &[LedgerEntry]) -> Vec<LedgerEntry> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let known = inner.history(booking_id);

        let extends = persisted.len() > known.len()
            && persisted.iter().all(|entry| entry.booking_id == booking_id)
            && Self::is_valid_walk(persisted)
            && known.iter().zip(persisted).all(|(ours, theirs)| {
                (ours.sequence, ours.from, ours.to) == (theirs.sequence, theirs.from, theirs.to)
            });

        if extends {
            for entry in &persisted[known.len()..] {
                inner.push(entry.clone());
            }
            tracing::debug!(
                booking_id = %booking_id,
                adopted = persisted.len() - known.len(),
                "Adopted persisted ledger entries"
            );
        }
        inner.history(booking_id)
    }

    /// Entries for one booking, oldest first.
    #[must_use]
    pub fn history(&self, booking_id: BookingId) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history(booking_id)
    }

    /// Every entry in append order.
    #[must_use]
    pub fn all(&self) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `entries` (one booking, oldest first) is a walk of the
    /// lifecycle graph starting at `Idle` with contiguous sequence numbers.
    #[must_use]
    pub fn is_valid_walk(entries: &[LedgerEntry]) -> bool {
        let mut current = BookingState::Idle;
        for (position, entry) in entries.iter().enumerate() {
            if entry.from != current
                || !entry.from.can_transition_to(entry.to)
                || entry.sequence != position as u64 + 1
            {
                return false;
            }
            current = entry.to;
        }
        true
    }
}
