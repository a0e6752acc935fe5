//! Reducer for the booking lifecycle.

use super::{BookingAction, BookingEnvironment};
use crate::consent::can_create_booking;
use crate::error::{BookingError, Collaborator, CollaboratorError, Result};
use crate::ledger::LedgerEntry;
use crate::metrics;
use crate::providers::{Notification, NotificationKind};
use crate::review;
use crate::types::{
    Actor, ArtistId, Booking, BookingDetails, BookingId, BookingState, ConsentRecord, CustomerId,
    LegalConsentState, Money, ReviewState, Transition,
};
use booking_engine_core::effect::{Effect, EffectId};
use booking_engine_core::reducer::Reducer;
use booking_engine_runtime::retry_with_predicate;
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Result of a successful command: the ledger entry (if the state moved) and
/// the follow-up effects.
type Step = (Option<LedgerEntry>, Effects);

/// Id under which the deferred requested → pending move is scheduled.
#[must_use]
pub fn auto_pending_effect_id(booking_id: BookingId) -> EffectId {
    EffectId::new(format!("auto-pending:{booking_id}"))
}

// ============================================================================
// State
// ============================================================================

/// State of the machine: one booking record plus the outcome of the last
/// command applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSlot {
    /// Booking the slot holds
    pub booking_id: BookingId,
    /// The record, `None` while the booking is idle
    pub booking: Option<Booking>,
    /// Transition recorded by the last command, if the state moved
    pub last_entry: Option<LedgerEntry>,
    /// Rejection of the last command
    pub last_error: Option<BookingError>,
}

impl BookingSlot {
    /// Slot for a booking that does not exist yet.
    #[must_use]
    pub const fn empty(booking_id: BookingId) -> Self {
        Self::new(booking_id, None)
    }

    /// Slot for a loaded booking.
    #[must_use]
    pub fn loaded(booking: Booking) -> Self {
        Self::new(booking.id, Some(booking))
    }

    /// Slot for `booking_id` holding whatever was loaded for it.
    #[must_use]
    pub const fn new(booking_id: BookingId, booking: Option<Booking>) -> Self {
        Self {
            booking_id,
            booking,
            last_entry: None,
            last_error: None,
        }
    }

    /// Current lifecycle state; `Idle` until created.
    #[must_use]
    pub fn state(&self) -> BookingState {
        self.booking
            .as_ref()
            .map_or(BookingState::Idle, |booking| booking.state)
    }

    /// Consume the outcome of the last command.
    ///
    /// `Ok(Some(entry))` means the state moved, `Ok(None)` means the command
    /// was a no-op.
    ///
    /// # Errors
    ///
    /// The error the last command was rejected with.
    pub fn take_outcome(&mut self) -> Result<Option<LedgerEntry>> {
        match self.last_error.take() {
            Some(error) => Err(error),
            None => Ok(self.last_entry.take()),
        }
    }

    fn require(
        &mut self,
        attempted: Transition,
        allowed: &[BookingState],
    ) -> Result<&mut Booking> {
        let current = self.state();
        match self.booking.as_mut() {
            Some(booking) if allowed.contains(&booking.state) => Ok(booking),
            _ => Err(BookingError::StateViolation { attempted, current }),
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// The booking lifecycle state machine.
///
/// A rejected command leaves the booking untouched, sets
/// [`BookingSlot::last_error`] and returns no effects.
#[derive(Clone, Debug, Default)]
pub struct BookingMachine;

impl BookingMachine {
    /// Creates a new `BookingMachine`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn create(
        slot: &mut BookingSlot,
        customer_id: CustomerId,
        artist_id: ArtistId,
        details: BookingDetails,
        consent: Option<ConsentRecord>,
        env: &BookingEnvironment,
    ) -> Result<Step> {
        if slot.booking.is_some() {
            return Err(BookingError::StateViolation {
                attempted: Transition::Create,
                current: slot.state(),
            });
        }

        let consent_state = if consent.is_some() {
            LegalConsentState::Agreed
        } else {
            LegalConsentState::NotAgreed
        };
        if !can_create_booking(slot.state(), consent_state) {
            return Err(BookingError::precondition(
                "customer has not agreed to the current legal terms",
            ));
        }
        if details.duration_minutes == Some(0) {
            return Err(BookingError::precondition(
                "requested duration must be greater than zero",
            ));
        }

        let now = env.clock.now();
        let booking_id = slot.booking_id;
        let booking = Booking {
            id: booking_id,
            customer_id: customer_id.clone(),
            artist_id,
            preferred_date: details.preferred_date,
            requested_duration: details.duration_minutes,
            description: details.description,
            confirmed_date: None,
            confirmed_duration: None,
            confirmed_price: None,
            state: BookingState::Requested,
            review_state: ReviewState::Locked,
            visited_studio: false,
            legal_consent: consent_state,
            consent_version: consent.as_ref().map(|c| c.version.clone()),
            consent_agreed_at: consent.as_ref().map(|c| c.agreed_at),
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            cancellation_reason: None,
        };

        let entry = LedgerEntry::new(
            booking_id,
            BookingState::Idle,
            BookingState::Requested,
            "booking requested",
            Actor::Customer(customer_id.clone()),
            now,
        );

        let effects: Effects = smallvec![
            notify(
                env,
                Notification {
                    recipient: booking.artist(),
                    booking_id,
                    kind: NotificationKind::StateChanged(BookingState::Requested),
                    message: format!("New booking request from {customer_id}"),
                },
            ),
            Effect::Delay {
                duration: env.auto_pending_delay,
                action: Box::new(BookingAction::AdvanceToPending { booking_id }),
            }
            .cancellable(auto_pending_effect_id(booking_id)),
        ];

        slot.booking = Some(booking);
        Ok((Some(entry), effects))
    }

    fn advance_to_pending(slot: &mut BookingSlot, env: &BookingEnvironment) -> Step {
        let booking_id = slot.booking_id;
        let state = slot.state();
        let Some(booking) = slot
            .booking
            .as_mut()
            .filter(|booking| booking.state == BookingState::Requested)
        else {
            // The booking moved on (or vanished) before the delay elapsed.
            tracing::debug!(
                booking_id = %booking_id,
                state = %state,
                "Ignoring stale advance to pending"
            );
            return (None, SmallVec::new());
        };

        let now = env.clock.now();
        booking.state = BookingState::Pending;
        booking.updated_at = now;

        let entry = LedgerEntry::new(
            booking_id,
            BookingState::Requested,
            BookingState::Pending,
            "awaiting artist response",
            Actor::System,
            now,
        );
        let effects: Effects = smallvec![notify(
            env,
            Notification {
                recipient: booking.artist(),
                booking_id,
                kind: NotificationKind::StateChanged(BookingState::Pending),
                message: "A booking request is awaiting your response".to_string(),
            },
        )];
        (Some(entry), effects)
    }

    fn accept(slot: &mut BookingSlot, env: &BookingEnvironment) -> Result<Step> {
        let booking = slot.require(Transition::Accept, &[BookingState::Pending])?;

        let now = env.clock.now();
        booking.state = BookingState::Confirmed;
        booking.confirmed_date = Some(booking.confirmed_date.unwrap_or(booking.preferred_date));
        booking.confirmed_duration = booking.confirmed_duration.or(booking.requested_duration);
        booking.confirmed_at = Some(now);
        booking.updated_at = now;

        let entry = LedgerEntry::new(
            booking.id,
            BookingState::Pending,
            BookingState::Confirmed,
            "accepted by artist",
            Actor::Artist(booking.artist_id.clone()),
            now,
        );
        let effects: Effects = smallvec![notify(
            env,
            Notification {
                recipient: booking.customer(),
                booking_id: booking.id,
                kind: NotificationKind::StateChanged(BookingState::Confirmed),
                message: format!("{} accepted your booking request", booking.artist_id),
            },
        )];
        Ok((Some(entry), effects))
    }

    fn confirm(
        slot: &mut BookingSlot,
        date: DateTime<Utc>,
        price: Money,
        duration_minutes: u32,
        env: &BookingEnvironment,
    ) -> Result<Step> {
        let booking = slot.require(
            Transition::Confirm,
            &[BookingState::Requested, BookingState::Pending],
        )?;
        if duration_minutes == 0 {
            return Err(BookingError::precondition(
                "confirmed duration must be greater than zero",
            ));
        }

        let now = env.clock.now();
        let from = booking.state;
        booking.state = BookingState::Confirmed;
        booking.confirmed_date = Some(date);
        booking.confirmed_price = Some(price);
        booking.confirmed_duration = Some(duration_minutes);
        booking.confirmed_at = Some(now);
        booking.updated_at = now;

        let entry = LedgerEntry::new(
            booking.id,
            from,
            BookingState::Confirmed,
            format!("confirmed for {date} ({duration_minutes} min, price {price})"),
            Actor::Artist(booking.artist_id.clone()),
            now,
        );

        let mut effects: Effects = smallvec![notify(
            env,
            Notification {
                recipient: booking.customer(),
                booking_id: booking.id,
                kind: NotificationKind::StateChanged(BookingState::Confirmed),
                message: format!("Your booking is confirmed for {date}"),
            },
        )];
        if from == BookingState::Requested {
            effects.push(Effect::Cancel(auto_pending_effect_id(booking.id)));
        }
        Ok((Some(entry), effects))
    }

    fn cancel(
        slot: &mut BookingSlot,
        reason: String,
        actor: Actor,
        env: &BookingEnvironment,
    ) -> Result<Step> {
        let booking = slot.require(
            Transition::Cancel,
            &[
                BookingState::Requested,
                BookingState::Pending,
                BookingState::Confirmed,
            ],
        )?;
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(BookingError::precondition(
                "a cancellation reason is required",
            ));
        }

        let now = env.clock.now();
        let from = booking.state;
        booking.state = BookingState::Cancelled;
        booking.cancellation_reason = Some(reason.clone());
        booking.updated_at = now;

        let message = format!("Booking cancelled by {actor}: {reason}");
        let entry = LedgerEntry::new(
            booking.id,
            from,
            BookingState::Cancelled,
            reason,
            actor,
            now,
        );

        let mut effects: Effects = [booking.customer(), booking.artist()]
            .into_iter()
            .map(|recipient| {
                notify(
                    env,
                    Notification {
                        recipient,
                        booking_id: booking.id,
                        kind: NotificationKind::StateChanged(BookingState::Cancelled),
                        message: message.clone(),
                    },
                )
            })
            .collect();
        if from == BookingState::Requested {
            effects.push(Effect::Cancel(auto_pending_effect_id(booking.id)));
        }
        Ok((Some(entry), effects))
    }

    fn complete(slot: &mut BookingSlot, env: &BookingEnvironment) -> Result<Step> {
        let booking = slot.require(Transition::Complete, &[BookingState::Confirmed])?;

        let now = env.clock.now();
        booking.state = BookingState::Completed;
        booking.visited_studio = true;
        booking.updated_at = now;

        let entry = LedgerEntry::new(
            booking.id,
            BookingState::Confirmed,
            BookingState::Completed,
            "treatment completed at the studio",
            Actor::Artist(booking.artist_id.clone()),
            now,
        );

        let mut effects: Effects = smallvec![notify(
            env,
            Notification {
                recipient: booking.customer(),
                booking_id: booking.id,
                kind: NotificationKind::StateChanged(BookingState::Completed),
                message: "Your session is complete".to_string(),
            },
        )];
        if review::is_eligible(booking) {
            effects.push(notify(
                env,
                Notification {
                    recipient: booking.customer(),
                    booking_id: booking.id,
                    kind: NotificationKind::ReviewAvailable,
                    message: format!("You can now review {}", booking.artist_id),
                },
            ));
        }
        Ok((Some(entry), effects))
    }
}

impl Reducer for BookingMachine {
    type State = BookingSlot;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        slot: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        slot.last_entry = None;
        slot.last_error = None;

        let outcome = match action {
            BookingAction::CreateBookingRequest {
                customer_id,
                artist_id,
                details,
                consent,
                ..
            } => Self::create(slot, customer_id, artist_id, details, consent, env),
            BookingAction::AdvanceToPending { .. } => Ok(Self::advance_to_pending(slot, env)),
            BookingAction::AcceptBooking { .. } => Self::accept(slot, env),
            BookingAction::ConfirmBooking {
                date,
                price,
                duration_minutes,
                ..
            } => Self::confirm(slot, date, price, duration_minutes, env),
            BookingAction::CancelBooking { reason, actor, .. } => {
                Self::cancel(slot, reason, actor, env)
            },
            BookingAction::CompleteBooking { .. } => Self::complete(slot, env),
        };

        match outcome {
            Ok((entry, effects)) => {
                slot.last_entry = entry;
                effects
            },
            Err(error) => {
                slot.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Best-effort delivery of `notification`, retried per the environment's
/// policy. A final failure is logged and counted, never fed back.
fn notify(env: &BookingEnvironment, notification: Notification) -> Effect<BookingAction> {
    let notifier = Arc::clone(&env.notifier);
    let policy = env.notify_policy.clone();

    Effect::Future(Box::pin(async move {
        let delivered = retry_with_predicate(
            &policy,
            "notify",
            || notifier.notify(notification.clone()),
            CollaboratorError::is_transient,
        )
        .await;

        if let Err(error) = delivered {
            metrics::record_collaborator_failure(Collaborator::Notification);
            tracing::error!(
                booking_id = %notification.booking_id,
                recipient = %notification.recipient,
                error = %error,
                "Notification not delivered; booking state is unaffected"
            );
        }
        None
    }))
}

