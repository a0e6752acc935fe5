//! Review unlock gate.
//!
//! A customer may review an artist only once the treatment is done and they
//! actually visited the studio. The gate moves `Locked → Unlocked →
//! Submitted` and never back.

use crate::error::{BookingError, Result};
use crate::types::{Booking, BookingState, ReviewPayload, ReviewState, Transition};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Whether the booking qualifies for a review at all.
#[must_use]
pub fn is_eligible(booking: &Booking) -> bool {
    booking.state == BookingState::Completed && booking.visited_studio
}

/// Whether the customer may write a review right now.
#[must_use]
pub fn can_write_review(booking: &Booking) -> bool {
    booking.review_state == ReviewState::Unlocked && is_eligible(booking)
}

/// Open the review gate.
///
/// Returns `true` if the booking changed, `false` if it was already unlocked.
///
/// # Errors
///
/// - [`BookingError::PreconditionFailed`] if the booking is not completed or
///   the customer never visited the studio.
/// - [`BookingError::ReviewStateViolation`] if the review was already submitted.
pub fn unlock_review(booking: &mut Booking) -> Result<bool> {
    match booking.review_state {
        ReviewState::Unlocked => return Ok(false),
        ReviewState::Submitted => {
            return Err(BookingError::ReviewStateViolation {
                attempted: Transition::UnlockReview,
                current: ReviewState::Submitted,
            });
        },
        ReviewState::Locked => {},
    }

    if booking.state != BookingState::Completed {
        return Err(BookingError::precondition(format!(
            "booking must be completed to unlock a review (is {})",
            booking.state
        )));
    }
    if !booking.visited_studio {
        return Err(BookingError::precondition(
            "customer has not visited the studio",
        ));
    }

    booking.review_state = ReviewState::Unlocked;
    Ok(true)
}

/// Check that `payload` may be submitted for `booking`.
///
/// # Errors
///
/// - [`BookingError::ReviewStateViolation`] unless the review is unlocked.
/// - [`BookingError::PreconditionFailed`] if the booking is no longer
///   eligible or the rating is out of range.
pub fn validate_submission(booking: &Booking, payload: &ReviewPayload) -> Result<()> {
    if booking.review_state != ReviewState::Unlocked {
        return Err(BookingError::ReviewStateViolation {
            attempted: Transition::SubmitReview,
            current: booking.review_state,
        });
    }
    if !is_eligible(booking) {
        return Err(BookingError::precondition(
            "booking is not eligible for a review",
        ));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&payload.rating) {
        return Err(BookingError::precondition(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {}",
            payload.rating
        )));
    }
    Ok(())
}

/// Mark the review submitted.
///
/// # Errors
///
/// See [`validate_submission`].
pub fn submit_review(booking: &mut Booking, payload: &ReviewPayload) -> Result<()> {
    validate_submission(booking, payload)?;
    booking.review_state = ReviewState::Submitted;
    Ok(())
}
