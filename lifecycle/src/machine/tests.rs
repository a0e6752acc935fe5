#![allow(clippy::unwrap_used)]

use super::*;
use crate::config::EngineConfig;
use crate::error::BookingError;
use crate::mocks::RecordingNotifier;
use crate::types::{
    Actor, ArtistId, Booking, BookingDetails, BookingId, BookingState, ConsentRecord, CustomerId,
    LegalConsentState, Money, ReviewState, Transition,
};
use booking_engine_testing::{FixedClock, ReducerTest, assertions, test_epoch};
use chrono::Duration;
use std::sync::Arc;

fn test_env() -> BookingEnvironment {
    BookingEnvironment::new(
        Arc::new(FixedClock::new(test_epoch())),
        Arc::new(RecordingNotifier::new()),
        &EngineConfig::default(),
    )
}

fn consent() -> Option<ConsentRecord> {
    Some(ConsentRecord {
        version: "2024-01".into(),
        text: "terms".into(),
        agreed_at: test_epoch(),
    })
}

fn create(booking_id: BookingId) -> BookingAction {
    BookingAction::CreateBookingRequest {
        booking_id,
        customer_id: CustomerId::new("alice"),
        artist_id: ArtistId::new("ink-master"),
        details: BookingDetails::at(test_epoch() + Duration::days(3))
            .with_duration(120)
            .with_description("fine line rose"),
        consent: consent(),
    }
}

fn booking_in(state: BookingState) -> Booking {
    let id = BookingId::new();
    Booking {
        id,
        customer_id: CustomerId::new("alice"),
        artist_id: ArtistId::new("ink-master"),
        preferred_date: test_epoch() + Duration::days(3),
        requested_duration: Some(120),
        description: String::new(),
        confirmed_date: None,
        confirmed_duration: None,
        confirmed_price: None,
        state,
        review_state: ReviewState::Locked,
        visited_studio: false,
        legal_consent: LegalConsentState::Agreed,
        consent_version: Some("2024-01".into()),
        consent_agreed_at: Some(test_epoch()),
        created_at: test_epoch(),
        updated_at: test_epoch(),
        confirmed_at: None,
        cancellation_reason: None,
    }
}

fn confirm(booking_id: BookingId) -> BookingAction {
    BookingAction::ConfirmBooking {
        booking_id,
        date: test_epoch() + Duration::days(4),
        price: Money::new(30_000),
        duration_minutes: 120,
    }
}

fn cancel(booking_id: BookingId) -> BookingAction {
    BookingAction::CancelBooking {
        booking_id,
        reason: "schedule change".into(),
        actor: Actor::Customer(CustomerId::new("alice")),
    }
}

#[test]
fn test_create_moves_idle_to_requested() {
    let id = BookingId::new();

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::empty(id))
        .when_action(create(id))
        .then_state(move |slot| {
            let booking = slot.booking.as_ref().unwrap();
            assert_eq!(booking.state, BookingState::Requested);
            assert_eq!(booking.legal_consent, LegalConsentState::Agreed);
            assert_eq!(booking.consent_version.as_deref(), Some("2024-01"));
            assert_eq!(booking.requested_duration, Some(120));

            let entry = slot.last_entry.as_ref().unwrap();
            assert_eq!((entry.from, entry.to), (BookingState::Idle, BookingState::Requested));
            assert!(slot.last_error.is_none());
        })
        .then_effects(move |effects| {
            assertions::assert_effects_count(effects, 2);
            assertions::assert_has_future_effect(effects);
            assertions::assert_schedules(effects, &auto_pending_effect_id(id));
        })
        .run();
}

#[test]
fn test_create_without_consent_is_rejected() {
    let id = BookingId::new();

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::empty(id))
        .when_action(BookingAction::CreateBookingRequest {
            booking_id: id,
            customer_id: CustomerId::new("alice"),
            artist_id: ArtistId::new("ink-master"),
            details: BookingDetails::at(test_epoch()),
            consent: None,
        })
        .then_state(|slot| {
            assert!(slot.booking.is_none());
            assert!(slot.last_entry.is_none());
            assert!(matches!(
                slot.last_error,
                Some(BookingError::PreconditionFailed { .. })
            ));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_create_twice_is_a_state_violation() {
    let id = BookingId::new();

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::empty(id))
        .when_action(create(id))
        .when_action(create(id))
        .then_state(|slot| {
            assert_eq!(
                slot.last_error,
                Some(BookingError::StateViolation {
                    attempted: Transition::Create,
                    current: BookingState::Requested,
                })
            );
        })
        .run();
}

#[test]
fn test_deferred_advance_moves_requested_to_pending() {
    let booking = booking_in(BookingState::Requested);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(BookingAction::AdvanceToPending { booking_id: id })
        .then_state(|slot| {
            assert_eq!(slot.state(), BookingState::Pending);
            let entry = slot.last_entry.as_ref().unwrap();
            assert_eq!(entry.actor, Actor::System);
        })
        .then_effects(assertions::assert_has_future_effect)
        .run();
}

#[test]
fn test_stale_advance_is_a_silent_noop() {
    for state in [
        BookingState::Pending,
        BookingState::Confirmed,
        BookingState::Cancelled,
        BookingState::Completed,
    ] {
        let booking = booking_in(state);
        let id = booking.id;

        ReducerTest::new(BookingMachine::new())
            .with_env(test_env())
            .given_state(BookingSlot::loaded(booking))
            .when_action(BookingAction::AdvanceToPending { booking_id: id })
            .then_state(move |slot| {
                assert_eq!(slot.state(), state);
                assert!(slot.last_entry.is_none());
                assert!(slot.last_error.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

#[test]
fn test_accept_only_from_pending() {
    let pending = booking_in(BookingState::Pending);
    let id = pending.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(pending))
        .when_action(BookingAction::AcceptBooking { booking_id: id })
        .then_state(|slot| {
            let booking = slot.booking.as_ref().unwrap();
            assert_eq!(booking.state, BookingState::Confirmed);
            assert_eq!(booking.confirmed_date, Some(booking.preferred_date));
            assert_eq!(booking.confirmed_at, Some(test_epoch()));
        })
        .run();

    let requested = booking_in(BookingState::Requested);
    let id = requested.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(requested))
        .when_action(BookingAction::AcceptBooking { booking_id: id })
        .then_state(|slot| {
            assert_eq!(slot.state(), BookingState::Requested);
            assert_eq!(
                slot.last_error,
                Some(BookingError::StateViolation {
                    attempted: Transition::Accept,
                    current: BookingState::Requested,
                })
            );
        })
        .run();
}

#[test]
fn test_direct_confirm_cancels_deferred_advance() {
    let booking = booking_in(BookingState::Requested);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(confirm(id))
        .then_state(|slot| {
            let booking = slot.booking.as_ref().unwrap();
            assert_eq!(booking.state, BookingState::Confirmed);
            assert_eq!(booking.confirmed_price, Some(Money::new(30_000)));
            assert_eq!(booking.confirmed_duration, Some(120));
            let entry = slot.last_entry.as_ref().unwrap();
            assert_eq!(entry.from, BookingState::Requested);
        })
        .then_effects(move |effects| {
            assertions::assert_cancels(effects, &auto_pending_effect_id(id));
        })
        .run();
}

#[test]
fn test_confirm_from_pending_needs_no_cancellation() {
    let booking = booking_in(BookingState::Pending);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(confirm(id))
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_no_cancellation(effects);
        })
        .run();
}

#[test]
fn test_confirm_requires_positive_duration() {
    let booking = booking_in(BookingState::Pending);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(BookingAction::ConfirmBooking {
            booking_id: id,
            date: test_epoch(),
            price: Money::new(0),
            duration_minutes: 0,
        })
        .then_state(|slot| {
            assert_eq!(slot.state(), BookingState::Pending);
            assert!(matches!(
                slot.last_error,
                Some(BookingError::PreconditionFailed { .. })
            ));
        })
        .run();
}

#[test]
fn test_cancel_notifies_both_parties() {
    let booking = booking_in(BookingState::Confirmed);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(cancel(id))
        .then_state(|slot| {
            let booking = slot.booking.as_ref().unwrap();
            assert_eq!(booking.state, BookingState::Cancelled);
            assert_eq!(booking.cancellation_reason.as_deref(), Some("schedule change"));
            let entry = slot.last_entry.as_ref().unwrap();
            assert_eq!(entry.reason, "schedule change");
            assert_eq!(entry.actor, Actor::Customer(CustomerId::new("alice")));
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 2);
            assertions::assert_no_cancellation(effects);
        })
        .run();
}

#[test]
fn test_second_cancel_is_a_state_violation() {
    let booking = booking_in(BookingState::Pending);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(cancel(id))
        .when_action(cancel(id))
        .then_state(|slot| {
            assert_eq!(slot.state(), BookingState::Cancelled);
            assert_eq!(
                slot.last_error,
                Some(BookingError::StateViolation {
                    attempted: Transition::Cancel,
                    current: BookingState::Cancelled,
                })
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_cancel_requires_reason() {
    let booking = booking_in(BookingState::Requested);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(BookingAction::CancelBooking {
            booking_id: id,
            reason: "   ".into(),
            actor: Actor::System,
        })
        .then_state(|slot| {
            assert_eq!(slot.state(), BookingState::Requested);
            assert!(matches!(
                slot.last_error,
                Some(BookingError::PreconditionFailed { .. })
            ));
        })
        .run();
}

#[test]
fn test_complete_marks_studio_visit() {
    let booking = booking_in(BookingState::Confirmed);
    let id = booking.id;

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::loaded(booking))
        .when_action(BookingAction::CompleteBooking { booking_id: id })
        .then_state(|slot| {
            let booking = slot.booking.as_ref().unwrap();
            assert_eq!(booking.state, BookingState::Completed);
            assert!(booking.visited_studio);
            assert_eq!(booking.review_state, ReviewState::Locked);
        })
        .then_effects(|effects| {
            // Completion notice plus review invitation.
            assertions::assert_effects_count(effects, 2);
        })
        .run();
}

#[test]
fn test_terminal_states_reject_every_command() {
    for state in [BookingState::Completed, BookingState::Cancelled] {
        for action in [
            BookingAction::AcceptBooking {
                booking_id: BookingId::new(),
            },
            confirm(BookingId::new()),
            cancel(BookingId::new()),
            BookingAction::CompleteBooking {
                booking_id: BookingId::new(),
            },
        ] {
            let attempted = action.transition();
            ReducerTest::new(BookingMachine::new())
                .with_env(test_env())
                .given_state(BookingSlot::loaded(booking_in(state)))
                .when_action(action)
                .then_state(move |slot| {
                    assert_eq!(slot.state(), state);
                    assert_eq!(
                        slot.last_error,
                        Some(BookingError::StateViolation {
                            attempted,
                            current: state,
                        })
                    );
                })
                .run();
        }
    }
}

#[test]
fn test_unknown_booking_reports_idle() {
    let id = BookingId::new();

    ReducerTest::new(BookingMachine::new())
        .with_env(test_env())
        .given_state(BookingSlot::empty(id))
        .when_action(BookingAction::CompleteBooking { booking_id: id })
        .then_state(|slot| {
            assert_eq!(
                slot.last_error,
                Some(BookingError::StateViolation {
                    attempted: Transition::Complete,
                    current: BookingState::Idle,
                })
            );
        })
        .run();
}

#[test]
fn test_take_outcome() {
    let mut slot = BookingSlot::empty(BookingId::new());
    assert_eq!(slot.take_outcome(), Ok(None));

    slot.last_error = Some(BookingError::precondition("x"));
    assert!(slot.take_outcome().is_err());
    assert!(slot.last_error.is_none());
}
