//! Commands understood by the booking state machine.

use crate::types::{
    Actor, ArtistId, BookingDetails, BookingId, ConsentRecord, CustomerId, Money, Transition,
};
use chrono::{DateTime, Utc};

/// Commands for one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingAction {
    /// Customer asks an artist for an appointment.
    CreateBookingRequest {
        /// Id for the new booking
        booking_id: BookingId,
        /// Requesting customer
        customer_id: CustomerId,
        /// Requested artist
        artist_id: ArtistId,
        /// What the customer asks for
        details: BookingDetails,
        /// The customer's acceptance of the current terms, if any
        consent: Option<ConsentRecord>,
    },

    /// Deferred move from requested to pending, dispatched by the engine.
    AdvanceToPending {
        /// Booking to advance
        booking_id: BookingId,
    },

    /// Artist accepts a pending request as asked.
    AcceptBooking {
        /// Booking to accept
        booking_id: BookingId,
    },

    /// Artist fixes date, price and duration.
    ConfirmBooking {
        /// Booking to confirm
        booking_id: BookingId,
        /// Agreed date
        date: DateTime<Utc>,
        /// Agreed price
        price: Money,
        /// Agreed session length
        duration_minutes: u32,
    },

    /// Either party calls the booking off.
    CancelBooking {
        /// Booking to cancel
        booking_id: BookingId,
        /// Why
        reason: String,
        /// Who
        actor: Actor,
    },

    /// Treatment finished at the studio.
    CompleteBooking {
        /// Booking to complete
        booking_id: BookingId,
    },
}

impl BookingAction {
    /// Booking this command targets.
    #[must_use]
    pub const fn booking_id(&self) -> BookingId {
        match self {
            Self::CreateBookingRequest { booking_id, .. }
            | Self::AdvanceToPending { booking_id }
            | Self::AcceptBooking { booking_id }
            | Self::ConfirmBooking { booking_id, .. }
            | Self::CancelBooking { booking_id, .. }
            | Self::CompleteBooking { booking_id } => *booking_id,
        }
    }

    /// The transition this command attempts.
    #[must_use]
    pub const fn transition(&self) -> Transition {
        match self {
            Self::CreateBookingRequest { .. } => Transition::Create,
            Self::AdvanceToPending { .. } => Transition::AdvanceToPending,
            Self::AcceptBooking { .. } => Transition::Accept,
            Self::ConfirmBooking { .. } => Transition::Confirm,
            Self::CancelBooking { .. } => Transition::Cancel,
            Self::CompleteBooking { .. } => Transition::Complete,
        }
    }
}
