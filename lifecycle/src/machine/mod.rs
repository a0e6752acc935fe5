//! Booking lifecycle state machine.
//!
//! [`BookingMachine`] is a [`Reducer`](booking_engine_core::reducer::Reducer)
//! over a single [`BookingSlot`]. It validates each command against the
//! lifecycle graph, applies the transition, records the resulting
//! [`LedgerEntry`](crate::ledger::LedgerEntry) on the slot and returns the
//! follow-up effects (notifications, the deferred move to pending and its
//! cancellation). It performs no I/O itself.

mod actions;
mod environment;
mod reducer;

#[cfg(test)]
mod tests;

pub use actions::BookingAction;
pub use environment::BookingEnvironment;
pub use reducer::{BookingMachine, BookingSlot, auto_pending_effect_id};
