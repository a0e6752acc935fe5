//! Shared fixtures for the booking integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::panic)]

use booking_engine_testing::{ManualClock, test_epoch};
use booking_lifecycle::mocks::{
    InMemoryBookingRepository, InMemoryReviewStore, MockAvailability, RecordingNotifier,
};
use booking_lifecycle::{
    ArtistId, Booking, BookingDetails, BookingOrchestrator, Collaborators, ConfirmOutcome,
    CustomerId, EngineConfig, LedgerEntry, Money, TransitionLedger,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Short delays and timeouts so the suite runs in real time.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        auto_pending_delay_ms: 50,
        collaborator_timeout_ms: 100,
        retry_max_attempts: 3,
        retry_initial_delay_ms: 5,
        retry_max_delay_ms: 20,
        ..EngineConfig::default()
    }
}

/// Like [`fast_config`], but the automatic move to pending never fires
/// during a test.
pub fn manual_pending_config() -> EngineConfig {
    EngineConfig {
        auto_pending_delay_ms: 60_000,
        ..fast_config()
    }
}

/// 2025-03-01 at `hour`:00 UTC.
pub fn march_first(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

/// Give spawned effects time to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

pub struct Harness {
    pub orchestrator: BookingOrchestrator,
    pub repository: Arc<InMemoryBookingRepository>,
    pub availability: Arc<MockAvailability>,
    pub notifier: Arc<RecordingNotifier>,
    pub reviews: Arc<InMemoryReviewStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, Arc::new(RecordingNotifier::new()))
    }

    pub fn with_notifier(config: EngineConfig, notifier: RecordingNotifier) -> Self {
        Self::build(config, Arc::new(notifier))
    }

    fn build(config: EngineConfig, notifier: Arc<RecordingNotifier>) -> Self {
        let repository = Arc::new(InMemoryBookingRepository::new());
        let availability = Arc::new(MockAvailability::default());
        let reviews = Arc::new(InMemoryReviewStore::new());
        let clock = Arc::new(ManualClock::new(test_epoch()));

        let orchestrator = BookingOrchestrator::new(
            config,
            Collaborators {
                repository: repository.clone(),
                availability: availability.clone(),
                notifier: notifier.clone(),
                reviews: reviews.clone(),
                clock: clock.clone(),
            },
        );

        Self {
            orchestrator,
            repository,
            availability,
            notifier,
            reviews,
            clock,
        }
    }

    /// Another orchestrator over the same collaborators, the way a second
    /// process or a restarted one sees them.
    pub fn sibling(&self) -> BookingOrchestrator {
        BookingOrchestrator::new(
            self.orchestrator.config().clone(),
            Collaborators {
                repository: self.repository.clone(),
                availability: self.availability.clone(),
                notifier: self.notifier.clone(),
                reviews: self.reviews.clone(),
                clock: self.clock.clone(),
            },
        )
    }

    /// A customer who accepted the current terms.
    pub fn customer(&self, name: &str) -> CustomerId {
        let customer = CustomerId::new(name);
        let version = self.orchestrator.config().terms_version.clone();
        self.orchestrator
            .agree_legal_terms(&customer, &version, "I accept the studio terms")
            .unwrap();
        customer
    }

    pub async fn request(
        &self,
        customer: &CustomerId,
        artist: &ArtistId,
        at: DateTime<Utc>,
        minutes: u32,
    ) -> Booking {
        self.orchestrator
            .create_booking_request(
                customer.clone(),
                artist.clone(),
                BookingDetails::at(at).with_duration(minutes),
            )
            .await
            .unwrap()
    }

    /// Request and immediately confirm on the requested terms.
    pub async fn confirmed(
        &self,
        customer: &CustomerId,
        artist: &ArtistId,
        at: DateTime<Utc>,
        minutes: u32,
    ) -> Booking {
        let booking = self.request(customer, artist, at, minutes).await;
        match self
            .orchestrator
            .confirm_booking(booking.id, at, Money::new(20_000), minutes)
            .await
            .unwrap()
        {
            ConfirmOutcome::Confirmed(booking) => booking,
            ConfirmOutcome::Conflict(conflict) => panic!("unexpected conflict: {conflict:?}"),
        }
    }

    /// Every booking's ledger history forms a legal walk.
    pub async fn assert_ledger_consistent(&self) {
        let all = self.orchestrator.full_history();
        let mut ids: Vec<_> = all.iter().map(|entry| entry.booking_id).collect();
        ids.sort();
        ids.dedup();

        for id in ids {
            let history: Vec<LedgerEntry> =
                self.orchestrator.transition_history(id).await.unwrap();
            assert!(
                TransitionLedger::is_valid_walk(&history),
                "invalid ledger walk for {id}: {history:?}"
            );
        }
    }
}
