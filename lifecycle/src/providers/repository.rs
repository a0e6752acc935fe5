//! Booking persistence.

use super::CollaboratorFuture;
use crate::ledger::LedgerEntry;
use crate::types::{Booking, BookingId, Participant};

/// Durable storage for bookings and their ledger.
///
/// The repository is the source of truth: the engine loads a booking at the
/// start of every command and only considers a transition applied once
/// [`save`](Self::save) succeeded.
pub trait BookingRepository: Send + Sync {
    /// Load a booking. `Ok(None)` means it does not exist.
    fn load(&self, id: BookingId) -> CollaboratorFuture<'_, Option<Booking>>;

    /// Insert or replace a booking.
    fn save(&self, booking: Booking) -> CollaboratorFuture<'_, ()>;

    /// Append a ledger entry to durable storage.
    fn append_ledger_entry(&self, entry: LedgerEntry) -> CollaboratorFuture<'_, ()>;

    /// Persisted ledger entries of one booking, ordered by sequence.
    fn ledger_history(&self, id: BookingId) -> CollaboratorFuture<'_, Vec<LedgerEntry>>;

    /// Every booking `participant` is a party to.
    fn list_by_participant(&self, participant: Participant) -> CollaboratorFuture<'_, Vec<Booking>>;
}
