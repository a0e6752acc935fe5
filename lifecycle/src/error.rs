//! Error types for the booking lifecycle.

use crate::types::{BookingState, ReviewState, Transition};
use booking_engine_runtime::RetryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// External dependency the engine calls out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collaborator {
    /// Booking and ledger storage
    Persistence,
    /// Artist calendar
    Availability,
    /// Customer/artist messaging
    Notification,
    /// Review content storage
    ReviewStorage,
}

impl Collaborator {
    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persistence => "persistence",
            Self::Availability => "availability",
            Self::Notification => "notification",
            Self::ReviewStorage => "review_storage",
        }
    }
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by lifecycle operations.
///
/// A conflicting confirmation is not an error: it is reported as
/// [`ConfirmOutcome::Conflict`](crate::orchestrator::ConfirmOutcome::Conflict).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// The command is not allowed from the booking's current state.
    ///
    /// Unknown booking ids report `current: Idle`.
    #[error("cannot {attempted} a booking in state {current}")]
    StateViolation {
        /// Command that was attempted
        attempted: Transition,
        /// State the booking was in
        current: BookingState,
    },

    /// The review move is not allowed from the current review state.
    #[error("cannot {attempted} when review is {current}")]
    ReviewStateViolation {
        /// Command that was attempted
        attempted: Transition,
        /// Review state the booking was in
        current: ReviewState,
    },

    /// A gate condition does not hold.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// What was missing
        reason: String,
    },

    /// A collaborator timed out or kept failing after every retry.
    #[error("{collaborator} gave up after {attempts} attempt(s): {last_error}")]
    CollaboratorTimeout {
        /// Which collaborator
        collaborator: Collaborator,
        /// Attempts made
        attempts: u32,
        /// Last failure observed
        last_error: String,
    },
}

impl BookingError {
    /// Build a [`BookingError::PreconditionFailed`].
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// Translate an exhausted retry into [`BookingError::CollaboratorTimeout`].
    pub fn collaborator(collaborator: Collaborator, error: &RetryError<CollaboratorError>) -> Self {
        let last_error = match error {
            RetryError::TimedOut { .. } => "timed out".to_string(),
            RetryError::Exhausted { error, .. } => error.to_string(),
        };
        Self::CollaboratorTimeout {
            collaborator,
            attempts: error.attempts(),
            last_error,
        }
    }

    /// Whether retrying the same call later might succeed.
    ///
    /// State violations and failed preconditions are deterministic for the
    /// current state; only collaborator failures are transient.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::CollaboratorTimeout { .. })
    }

    /// Whether this is a booking or review state violation.
    #[must_use]
    pub const fn is_state_violation(&self) -> bool {
        matches!(
            self,
            Self::StateViolation { .. } | Self::ReviewStateViolation { .. }
        )
    }
}

/// Failure reported by a collaborator implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Temporarily unreachable; worth retrying.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Refused the request; retrying will not help.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    /// Whether the retry loop should try again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_collaborator_failures_are_recoverable() {
        let violation = BookingError::StateViolation {
            attempted: Transition::Complete,
            current: BookingState::Pending,
        };
        let timeout = BookingError::CollaboratorTimeout {
            collaborator: Collaborator::Persistence,
            attempts: 4,
            last_error: "timed out".into(),
        };

        assert!(!violation.is_recoverable());
        assert!(!BookingError::precondition("no consent").is_recoverable());
        assert!(timeout.is_recoverable());
    }

    #[test]
    fn test_retry_error_translation() {
        let timed_out = BookingError::collaborator(
            Collaborator::Availability,
            &RetryError::TimedOut { attempts: 3 },
        );
        assert_eq!(
            timed_out,
            BookingError::CollaboratorTimeout {
                collaborator: Collaborator::Availability,
                attempts: 3,
                last_error: "timed out".into(),
            }
        );

        let exhausted = BookingError::collaborator(
            Collaborator::Persistence,
            &RetryError::Exhausted {
                attempts: 1,
                error: CollaboratorError::Rejected("constraint".into()),
            },
        );
        assert!(matches!(
            exhausted,
            BookingError::CollaboratorTimeout { attempts: 1, ref last_error, .. }
                if last_error == "rejected: constraint"
        ));
    }

    #[test]
    fn test_state_violation_message_names_both_sides() {
        let error = BookingError::StateViolation {
            attempted: Transition::Confirm,
            current: BookingState::Cancelled,
        };
        assert_eq!(error.to_string(), "cannot confirm a booking in state cancelled");
    }
}
