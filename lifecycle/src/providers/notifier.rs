//! Outbound notifications.

use super::CollaboratorFuture;
use crate::types::{BookingId, BookingState, Participant};
use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Booking moved to a new state
    StateChanged(BookingState),
    /// The customer may now write a review
    ReviewAvailable,
}

/// A message for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Who receives it
    pub recipient: Participant,
    /// Booking it concerns
    pub booking_id: BookingId,
    /// What happened
    pub kind: NotificationKind,
    /// Human-readable text
    pub message: String,
}

/// Delivers messages to customers and artists.
///
/// Delivery is best-effort: a failure is logged and never rolls back the
/// transition that triggered it.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification) -> CollaboratorFuture<'_, ()>;
}
