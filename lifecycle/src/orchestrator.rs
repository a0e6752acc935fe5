//! Booking orchestrator.
//!
//! The imperative shell around [`BookingMachine`]. For every command it:
//!
//! 1. takes the per-booking lock (accepting and confirming also take the
//!    artist lock, always artist first),
//! 2. loads the booking from the repository,
//! 3. reduces the command,
//! 4. saves the result, with timeout and retry,
//! 5. appends the transition to the ledger and persists the entry,
//! 6. hands the returned effects to the executor.
//!
//! A failed save surfaces as [`BookingError::CollaboratorTimeout`] and
//! nothing after step 4 happens, so the persisted record, the ledger and the
//! scheduled follow-ups never disagree.

use crate::config::EngineConfig;
use crate::conflict::{ConflictOutcome, ConflictResolver};
use crate::consent::{self, LegalConsentGate};
use crate::error::{BookingError, Collaborator, CollaboratorError, Result};
use crate::ledger::{LedgerEntry, TransitionLedger};
use crate::machine::{BookingAction, BookingEnvironment, BookingMachine, BookingSlot};
use crate::metrics;
use crate::providers::{
    AvailabilityProvider, BookingRepository, Notifier, ReviewStore, SubmittedReview,
};
use crate::review;
use crate::types::{
    Actor, ArtistId, Booking, BookingDetails, BookingId, BookingState, ConsentRecord, CustomerId,
    LegalConsentState, Money, Participant, ReviewPayload, TimeWindow, Transition,
};
use booking_engine_core::environment::Clock;
use booking_engine_core::reducer::Reducer;
use booking_engine_runtime::{
    BoxedTask, Dispatch, EffectExecutor, KeyedLocks, RetryError, RetryPolicy, retry_with_predicate,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};

/// Result of [`BookingOrchestrator::confirm_booking`] and
/// [`BookingOrchestrator::accept_booking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The booking is now confirmed.
    Confirmed(Booking),
    /// The slot is taken by another confirmed booking; nothing was changed.
    Conflict(ConflictOutcome),
}

impl ConfirmOutcome {
    /// The confirmed booking, if confirmation went through.
    #[must_use]
    pub const fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Confirmed(booking) => Some(booking),
            Self::Conflict(_) => None,
        }
    }

    /// The conflict, if one was detected.
    #[must_use]
    pub const fn conflict(&self) -> Option<&ConflictOutcome> {
        match self {
            Self::Confirmed(_) => None,
            Self::Conflict(outcome) => Some(outcome),
        }
    }
}

/// External dependencies of the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    /// Booking and ledger storage
    pub repository: Arc<dyn BookingRepository>,
    /// Artist calendar
    pub availability: Arc<dyn AvailabilityProvider>,
    /// Customer/artist messaging
    pub notifier: Arc<dyn Notifier>,
    /// Review content storage
    pub reviews: Arc<dyn ReviewStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

struct Inner {
    config: EngineConfig,
    policy: RetryPolicy,
    machine: BookingMachine,
    env: BookingEnvironment,
    repository: Arc<dyn BookingRepository>,
    availability: Arc<dyn AvailabilityProvider>,
    reviews: Arc<dyn ReviewStore>,
    resolver: ConflictResolver,
    ledger: TransitionLedger,
    consent: LegalConsentGate,
    booking_locks: KeyedLocks<BookingId>,
    artist_locks: KeyedLocks<ArtistId>,
    executor: EffectExecutor<BookingAction>,
}

/// Entry point for every booking operation.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct BookingOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BookingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingOrchestrator")
            .field("config", &self.inner.config)
            .field("ledger_entries", &self.inner.ledger.len())
            .field("executor", &self.inner.executor)
            .finish_non_exhaustive()
    }
}

impl BookingOrchestrator {
    /// Wire an orchestrator. Must be called inside a Tokio runtime before
    /// any command is issued.
    #[must_use]
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            repository,
            availability,
            notifier,
            reviews,
            clock,
        } = collaborators;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            // Deferred actions re-enter through the orchestrator so they take
            // the same lock and persistence path as external commands. The
            // weak handle lets pending tasks die quietly after shutdown.
            let weak = weak.clone();
            let dispatch: Dispatch<BookingAction> = Arc::new(move |action: BookingAction| -> BoxedTask {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        BookingOrchestrator { inner }.run_deferred(action).await;
                    }
                })
            });

            Inner {
                policy: config.retry_policy(),
                machine: BookingMachine::new(),
                env: BookingEnvironment::new(clock, notifier, &config),
                resolver: ConflictResolver::new(Arc::clone(&availability), &config),
                repository,
                availability,
                reviews,
                ledger: TransitionLedger::new(),
                consent: LegalConsentGate::new(config.terms_version.clone()),
                booking_locks: KeyedLocks::new(),
                artist_locks: KeyedLocks::new(),
                executor: EffectExecutor::new(dispatch),
                config,
            }
        });

        Self { inner }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ========================================================================
    // Consent
    // ========================================================================

    /// Record that `customer_id` accepted `version` of the legal terms.
    ///
    /// # Errors
    ///
    /// [`BookingError::PreconditionFailed`] if `version` is blank.
    #[tracing::instrument(skip_all, fields(customer = %customer_id, version = %version))]
    pub fn agree_legal_terms(
        &self,
        customer_id: &CustomerId,
        version: &str,
        text: &str,
    ) -> Result<ConsentRecord> {
        self.inner
            .consent
            .agree_legal_terms(customer_id, version, text, self.now())
    }

    /// Consent state of `customer_id` against the current terms.
    #[must_use]
    pub fn consent_state(&self, customer_id: &CustomerId) -> LegalConsentState {
        self.inner.consent.consent_state(customer_id)
    }

    /// Whether `customer_id` may create a booking. `None` asks about a new
    /// booking; an existing booking is never idle, so the answer is `false`.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the booking cannot be loaded.
    pub async fn can_create_booking(
        &self,
        customer_id: &CustomerId,
        booking_id: Option<BookingId>,
    ) -> Result<bool> {
        let state = match booking_id {
            Some(id) => self
                .load(id)
                .await?
                .map_or(BookingState::Idle, |booking| booking.state),
            None => BookingState::Idle,
        };
        Ok(consent::can_create_booking(
            state,
            self.consent_state(customer_id),
        ))
    }

    // ========================================================================
    // Lifecycle commands
    // ========================================================================

    /// Create a booking request in state `Requested`.
    ///
    /// The booking moves to `Pending` on its own after the configured delay
    /// unless it is confirmed or cancelled first.
    ///
    /// # Errors
    ///
    /// - [`BookingError::PreconditionFailed`] without consent to the current terms.
    /// - [`BookingError::CollaboratorTimeout`] if the booking cannot be saved.
    #[tracing::instrument(skip_all, fields(customer = %customer_id, artist = %artist_id))]
    pub async fn create_booking_request(
        &self,
        customer_id: CustomerId,
        artist_id: ArtistId,
        details: BookingDetails,
    ) -> Result<Booking> {
        let consent = self.inner.consent.current_record(&customer_id);
        self.command(BookingAction::CreateBookingRequest {
            booking_id: BookingId::new(),
            customer_id,
            artist_id,
            details,
            consent,
        })
        .await
    }

    /// Artist accepts a pending request on the requested terms.
    ///
    /// Accepting claims the requested window, so it is checked for overlaps
    /// exactly like [`confirm_booking`](Self::confirm_booking).
    ///
    /// # Errors
    ///
    /// - [`BookingError::StateViolation`] unless the booking is pending.
    /// - [`BookingError::CollaboratorTimeout`] if persistence or the calendar fails.
    #[tracing::instrument(skip(self))]
    pub async fn accept_booking(&self, booking_id: BookingId) -> Result<ConfirmOutcome> {
        self.claim_slot(
            BookingAction::AcceptBooking { booking_id },
            |booking, default_duration| {
                (booking.state == BookingState::Pending).then(|| booking.window(default_duration))
            },
        )
        .await
    }

    /// Artist confirms date, price and duration.
    ///
    /// Allowed from `Requested` and `Pending`. If another confirmed booking
    /// with the same artist overlaps the proposed window, the booking is left
    /// unchanged and the conflict is returned with alternative slots.
    ///
    /// # Errors
    ///
    /// - [`BookingError::StateViolation`] from any other state.
    /// - [`BookingError::PreconditionFailed`] if `duration_minutes` is zero.
    /// - [`BookingError::CollaboratorTimeout`] if persistence or the calendar fails.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_booking(
        &self,
        booking_id: BookingId,
        date: DateTime<Utc>,
        price: Money,
        duration_minutes: u32,
    ) -> Result<ConfirmOutcome> {
        self.claim_slot(
            BookingAction::ConfirmBooking {
                booking_id,
                date,
                price,
                duration_minutes,
            },
            |booking, _| {
                let confirmable =
                    matches!(booking.state, BookingState::Requested | BookingState::Pending);
                (confirmable && duration_minutes > 0)
                    .then(|| TimeWindow::new(date, duration_minutes))
            },
        )
        .await
    }

    /// Cancel a requested, pending or confirmed booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::StateViolation`] if already completed or cancelled.
    /// - [`BookingError::PreconditionFailed`] if `reason` is blank.
    /// - [`BookingError::CollaboratorTimeout`] if persistence fails.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        reason: impl Into<String>,
        actor: Actor,
    ) -> Result<Booking> {
        self.command(BookingAction::CancelBooking {
            booking_id,
            reason: reason.into(),
            actor,
        })
        .await
    }

    /// Mark a confirmed booking as completed; the customer visited the studio.
    ///
    /// # Errors
    ///
    /// - [`BookingError::StateViolation`] unless the booking is confirmed.
    /// - [`BookingError::CollaboratorTimeout`] if persistence fails.
    #[tracing::instrument(skip(self))]
    pub async fn complete_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.command(BookingAction::CompleteBooking { booking_id })
            .await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Open the review gate of a completed booking.
    ///
    /// Unlocking an already unlocked review is a no-op.
    ///
    /// # Errors
    ///
    /// - [`BookingError::PreconditionFailed`] if not completed or not visited.
    /// - [`BookingError::ReviewStateViolation`] if already submitted.
    /// - [`BookingError::StateViolation`] for an unknown booking.
    /// - [`BookingError::CollaboratorTimeout`] if persistence fails.
    #[tracing::instrument(skip(self))]
    pub async fn unlock_review(&self, booking_id: BookingId) -> Result<Booking> {
        let _guard = self.inner.booking_locks.lock(&booking_id).await;
        let mut booking = self.require(booking_id, Transition::UnlockReview).await?;

        let changed = review::unlock_review(&mut booking)
            .map_err(|error| Self::rejected(booking_id, error))?;
        if changed {
            booking.updated_at = self.now();
            self.save(&booking).await?;
            tracing::info!(booking_id = %booking_id, "Review unlocked");
        }
        Ok(booking)
    }

    /// Submit the customer's review.
    ///
    /// The content goes to the review store before the booking is saved as
    /// `Submitted`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ReviewStateViolation`] unless the review is unlocked.
    /// - [`BookingError::PreconditionFailed`] for an ineligible booking or a
    ///   rating outside 1..=5.
    /// - [`BookingError::CollaboratorTimeout`] if review storage or
    ///   persistence fails.
    #[tracing::instrument(skip(self, payload), fields(rating = payload.rating))]
    pub async fn submit_review(
        &self,
        booking_id: BookingId,
        payload: ReviewPayload,
    ) -> Result<Booking> {
        let _guard = self.inner.booking_locks.lock(&booking_id).await;
        let mut booking = self.require(booking_id, Transition::SubmitReview).await?;

        review::submit_review(&mut booking, &payload)
            .map_err(|error| Self::rejected(booking_id, error))?;

        let now = self.now();
        booking.updated_at = now;
        let submitted = SubmittedReview {
            booking_id,
            customer_id: booking.customer_id.clone(),
            artist_id: booking.artist_id.clone(),
            payload,
            submitted_at: now,
        };

        let reviews = &self.inner.reviews;
        retry_with_predicate(
            &self.inner.policy,
            "store_review",
            || reviews.store_review(submitted.clone()),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| Self::gave_up(Collaborator::ReviewStorage, &error))?;

        self.save(&booking).await?;
        tracing::info!(booking_id = %booking_id, "Review submitted");
        Ok(booking)
    }

    /// Whether the customer may write a review for `booking_id` now.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the booking cannot be loaded.
    pub async fn can_write_review(&self, booking_id: BookingId) -> Result<bool> {
        Ok(self
            .load(booking_id)
            .await?
            .is_some_and(|booking| review::can_write_review(&booking)))
    }

    // ========================================================================
    // Conflicts
    // ========================================================================

    /// Settle a conflict between two bookings for the same artist slot.
    ///
    /// Neither booking is modified.
    ///
    /// # Errors
    ///
    /// - [`BookingError::PreconditionFailed`] if either booking is missing,
    ///   they are with different artists, or neither is confirmed.
    /// - [`BookingError::CollaboratorTimeout`] if persistence or the calendar fails.
    #[tracing::instrument(skip(self))]
    pub async fn handle_concurrent_booking(
        &self,
        booking_id: BookingId,
        competitor_id: BookingId,
    ) -> Result<ConflictOutcome> {
        let booking = self.existing(booking_id).await?;
        let competitor = self.existing(competitor_id).await?;
        self.inner
            .resolver
            .resolve(&booking, &competitor, self.now())
            .await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current persisted copy of a booking.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the booking cannot be loaded.
    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        self.load(booking_id).await
    }

    /// Every booking `participant` is a party to.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the repository fails.
    pub async fn bookings_for(&self, participant: Participant) -> Result<Vec<Booking>> {
        let repository = &self.inner.repository;
        retry_with_predicate(
            &self.inner.policy,
            "list_bookings",
            || repository.list_by_participant(participant.clone()),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| Self::gave_up(Collaborator::Persistence, &error))
    }

    /// Recorded transitions of one booking, oldest first.
    ///
    /// Entries persisted by another orchestrator sharing the repository are
    /// adopted into the local ledger first.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the persisted ledger cannot be read.
    pub async fn transition_history(&self, booking_id: BookingId) -> Result<Vec<LedgerEntry>> {
        let persisted = self.persisted_history(booking_id).await?;
        Ok(self.inner.ledger.reconcile(booking_id, &persisted))
    }

    /// Every transition this orchestrator recorded or adopted, in append order.
    #[must_use]
    pub fn full_history(&self) -> Vec<LedgerEntry> {
        self.inner.ledger.all()
    }

    /// Number of scheduled follow-ups still waiting to fire.
    #[must_use]
    pub fn pending_follow_ups(&self) -> usize {
        self.inner.executor.registry().len()
    }

    /// Cancel every scheduled follow-up. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.inner.executor.cancel_all();
        tracing::info!(cancelled, "Booking orchestrator shut down");
        cancelled
    }

    // ========================================================================
    // Command pipeline
    // ========================================================================

    /// Accept or confirm under the artist lock. `proposed_window` returns the
    /// window the booking would claim, or `None` when the reducer is going to
    /// reject the command anyway.
    async fn claim_slot<W>(
        &self,
        action: BookingAction,
        proposed_window: W,
    ) -> Result<ConfirmOutcome>
    where
        W: Fn(&Booking, u32) -> Option<TimeWindow>,
    {
        let booking_id = action.booking_id();
        let Some(artist_id) = self.load(booking_id).await?.map(|b| b.artist_id) else {
            return Err(Self::rejected(
                booking_id,
                BookingError::StateViolation {
                    attempted: action.transition(),
                    current: BookingState::Idle,
                },
            ));
        };

        let _artist = self.inner.artist_locks.lock(&artist_id).await;
        let _booking = self.inner.booking_locks.lock(&booking_id).await;

        let existing = self.load(booking_id).await?;
        let default_duration = self.inner.config.default_duration_minutes;
        let claim = existing.as_ref().and_then(|booking| {
            proposed_window(booking, default_duration).map(|window| (booking, window))
        });

        if let Some((booking, window)) = claim {
            if let Some(competitor) = self.find_overlapping(booking, window).await? {
                let mut proposal = booking.clone();
                proposal.confirmed_date = Some(window.start);
                proposal.confirmed_duration = Some(window.duration_minutes);

                let outcome = self
                    .inner
                    .resolver
                    .resolve(&proposal, &competitor, self.now())
                    .await?;
                return Ok(ConfirmOutcome::Conflict(outcome));
            }
        }

        let booking = self.apply(existing, action).await?;
        Ok(ConfirmOutcome::Confirmed(booking))
    }

    async fn command(&self, action: BookingAction) -> Result<Booking> {
        let booking_id = action.booking_id();
        let _guard = self.inner.booking_locks.lock(&booking_id).await;
        let existing = self.load(booking_id).await?;
        self.apply(existing, action).await
    }

    /// Reduce `action` against `existing`, then persist, record and execute.
    /// The caller holds the booking lock.
    async fn apply(&self, existing: Option<Booking>, action: BookingAction) -> Result<Booking> {
        let booking_id = action.booking_id();
        let attempted = action.transition();

        let mut slot = BookingSlot::new(booking_id, existing);
        let effects = self
            .inner
            .machine
            .reduce(&mut slot, action, &self.inner.env);

        let entry = slot
            .take_outcome()
            .map_err(|error| Self::rejected(booking_id, error))?;
        let booking = slot.booking.ok_or(BookingError::StateViolation {
            attempted,
            current: BookingState::Idle,
        })?;

        let Some(entry) = entry else {
            return Ok(booking);
        };

        self.save(&booking).await?;
        self.record(entry).await;
        self.inner.executor.execute_all(effects);
        Ok(booking)
    }

    async fn run_deferred(&self, action: BookingAction) {
        let booking_id = action.booking_id();
        let attempted = action.transition();
        if let Err(error) = self.command(action).await {
            tracing::warn!(
                booking_id = %booking_id,
                attempted = %attempted,
                error = %error,
                "Deferred transition failed"
            );
        }
    }

    /// Record a transition whose save already succeeded. Never drops it.
    async fn record(&self, entry: LedgerEntry) {
        let entry = match self.inner.ledger.append(entry.clone()) {
            Some(stored) => stored,
            None => self.catch_up_and_append(entry).await,
        };

        metrics::record_transition(entry.from, entry.to);
        tracing::info!(
            booking_id = %entry.booking_id,
            from = %entry.from,
            to = %entry.to,
            actor = %entry.actor,
            sequence = entry.sequence,
            "Booking transition applied"
        );

        let repository = &self.inner.repository;
        let persisted = retry_with_predicate(
            &self.inner.policy,
            "append_ledger_entry",
            || repository.append_ledger_entry(entry.clone()),
            CollaboratorError::is_transient,
        )
        .await;

        if let Err(error) = persisted {
            metrics::record_collaborator_failure(Collaborator::Persistence);
            tracing::error!(
                booking_id = %entry.booking_id,
                sequence = entry.sequence,
                error = %error,
                "Ledger entry not persisted"
            );
        }
    }

    /// The local ledger is behind the repository: another orchestrator or an
    /// earlier process moved this booking. Adopt the persisted history, then
    /// append; if the history is still discontinuous, keep the entry anyway.
    async fn catch_up_and_append(&self, entry: LedgerEntry) -> LedgerEntry {
        let booking_id = entry.booking_id;
        match self.persisted_history(booking_id).await {
            Ok(persisted) => {
                self.inner.ledger.reconcile(booking_id, &persisted);
            },
            Err(error) => tracing::warn!(
                booking_id = %booking_id,
                error = %error,
                "Persisted ledger unavailable"
            ),
        }

        if let Some(stored) = self.inner.ledger.append(entry.clone()) {
            return stored;
        }

        tracing::error!(
            booking_id = %booking_id,
            from = %entry.from,
            to = %entry.to,
            "Ledger history has a gap; recording transition anyway"
        );
        self.inner.ledger.append_after_gap(entry)
    }

    fn rejected(booking_id: BookingId, error: BookingError) -> BookingError {
        if let BookingError::StateViolation { attempted, .. }
        | BookingError::ReviewStateViolation { attempted, .. } = &error
        {
            metrics::record_state_violation(*attempted);
        }
        tracing::warn!(
            booking_id = %booking_id,
            error = %error,
            "Command rejected"
        );
        error
    }

    // ========================================================================
    // Collaborator calls
    // ========================================================================

    async fn load(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let repository = &self.inner.repository;
        retry_with_predicate(
            &self.inner.policy,
            "load_booking",
            || repository.load(booking_id),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| Self::gave_up(Collaborator::Persistence, &error))
    }

    async fn require(&self, booking_id: BookingId, attempted: Transition) -> Result<Booking> {
        match self.load(booking_id).await? {
            Some(booking) => Ok(booking),
            None => Err(Self::rejected(
                booking_id,
                BookingError::StateViolation {
                    attempted,
                    current: BookingState::Idle,
                },
            )),
        }
    }

    async fn existing(&self, booking_id: BookingId) -> Result<Booking> {
        self.load(booking_id)
            .await?
            .ok_or_else(|| BookingError::precondition(format!("booking {booking_id} not found")))
    }

    async fn persisted_history(&self, booking_id: BookingId) -> Result<Vec<LedgerEntry>> {
        let repository = &self.inner.repository;
        retry_with_predicate(
            &self.inner.policy,
            "ledger_history",
            || repository.ledger_history(booking_id),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| Self::gave_up(Collaborator::Persistence, &error))
    }

    async fn save(&self, booking: &Booking) -> Result<()> {
        let repository = &self.inner.repository;
        retry_with_predicate(
            &self.inner.policy,
            "save_booking",
            || repository.save(booking.clone()),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| Self::gave_up(Collaborator::Persistence, &error))
    }

    /// First other confirmed booking with the same artist whose window the
    /// calendar reports as overlapping `proposed`.
    async fn find_overlapping(
        &self,
        booking: &Booking,
        proposed: TimeWindow,
    ) -> Result<Option<Booking>> {
        let candidates = self.bookings_for(booking.artist()).await?;
        let default_duration = self.inner.config.default_duration_minutes;
        let availability = &self.inner.availability;

        for other in candidates
            .into_iter()
            .filter(|other| other.id != booking.id && other.state == BookingState::Confirmed)
        {
            let theirs = other.window(default_duration);
            let overlaps = retry_with_predicate(
                &self.inner.policy,
                "windows_overlap",
                || availability.windows_overlap(booking.artist_id.clone(), proposed, theirs),
                CollaboratorError::is_transient,
            )
            .await
            .map_err(|error| Self::gave_up(Collaborator::Availability, &error))?;

            if overlaps {
                return Ok(Some(other));
            }
        }
        Ok(None)
    }

    fn gave_up(collaborator: Collaborator, error: &RetryError<CollaboratorError>) -> BookingError {
        metrics::record_collaborator_failure(collaborator);
        BookingError::collaborator(collaborator, error)
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.env.clock.now()
    }
}
