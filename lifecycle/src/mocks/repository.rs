//! In-memory booking repository.

use super::take_failure;
use crate::error::CollaboratorError;
use crate::ledger::LedgerEntry;
use crate::providers::{BookingRepository, CollaboratorFuture};
use crate::types::{Booking, BookingId, Participant};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Repository backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<BookingId, Booking>>,
    ledger: Mutex<Vec<LedgerEntry>>,
    save_latency: Mutex<Option<Duration>>,
    failing_saves: AtomicU32,
    failing_ledger_appends: AtomicU32,
    saves: AtomicU32,
}

impl InMemoryBookingRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `booking` directly, bypassing the engine.
    pub fn insert(&self, booking: Booking) {
        self.bookings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(booking.id, booking);
    }

    /// Current stored copy of a booking.
    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Ledger entries mirrored so far.
    #[must_use]
    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Delay every save by `latency` (`None` to disable).
    pub fn set_save_latency(&self, latency: Option<Duration>) {
        *self
            .save_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Fail the next `count` saves with [`CollaboratorError::Unavailable`].
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` ledger appends with [`CollaboratorError::Unavailable`].
    pub fn fail_next_ledger_appends(&self, count: u32) {
        self.failing_ledger_appends.store(count, Ordering::SeqCst);
    }

    fn current_save_latency(&self) -> Option<Duration> {
        *self
            .save_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookingRepository for InMemoryBookingRepository {
    fn load(&self, id: BookingId) -> CollaboratorFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(self.get(id)) })
    }

    fn save(&self, booking: Booking) -> CollaboratorFuture<'_, ()> {
        Box::pin(async move {
            if let Some(latency) = self.current_save_latency() {
                tokio::time::sleep(latency).await;
            }
            if take_failure(&self.failing_saves) {
                return Err(CollaboratorError::Unavailable(
                    "injected save failure".to_string(),
                ));
            }
            self.insert(booking);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn append_ledger_entry(&self, entry: LedgerEntry) -> CollaboratorFuture<'_, ()> {
        Box::pin(async move {
            if take_failure(&self.failing_ledger_appends) {
                return Err(CollaboratorError::Unavailable(
                    "injected ledger failure".to_string(),
                ));
            }
            self.ledger
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entry);
            Ok(())
        })
    }

    fn ledger_history(&self, id: BookingId) -> CollaboratorFuture<'_, Vec<LedgerEntry>> {
        Box::pin(async move {
            let mut history: Vec<LedgerEntry> = self
                .ledger_entries()
                .into_iter()
                .filter(|entry| entry.booking_id == id)
                .collect();
            history.sort_by_key(|entry| entry.sequence);
            Ok(history)
        })
    }

    fn list_by_participant(&self, participant: Participant) -> CollaboratorFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let mut found: Vec<Booking> = self
                .bookings
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .filter(|booking| booking.involves(&participant))
                .cloned()
                .collect();
            found.sort_by_key(|booking| booking.created_at);
            Ok(found)
        })
    }
}
