//! Business metrics for the booking engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_transitions_total{from,to}` - Lifecycle transitions applied
//! - `booking_state_violations_total{attempted}` - Commands rejected by the state machine
//! - `booking_conflicts_total` - Overlapping confirmations detected
//! - `booking_collaborator_failures_total{collaborator}` - Collaborator calls that gave up
//! - `booking_runtime_retries_total{operation}` - Retries (recorded by the runtime crate)
//!
//! ## Histograms
//! - `booking_conflict_alternatives` - Alternative slots offered per conflict

use crate::error::Collaborator;
use crate::types::{BookingState, Transition};
use metrics::{describe_counter, describe_histogram};

/// Register all metric descriptions.
///
/// Call once at startup, before any metric is recorded.
pub fn register_booking_metrics() {
    describe_counter!(
        "booking_transitions_total",
        "Booking lifecycle transitions applied, by source and target state"
    );
    describe_counter!(
        "booking_state_violations_total",
        "Commands rejected because the booking was in the wrong state"
    );
    describe_counter!(
        "booking_conflicts_total",
        "Confirmations that overlapped an already confirmed booking"
    );
    describe_histogram!(
        "booking_conflict_alternatives",
        "Number of alternative slots offered per conflict"
    );
    describe_counter!(
        "booking_collaborator_failures_total",
        "Collaborator calls that failed after every retry"
    );
    describe_counter!(
        "booking_runtime_retries_total",
        "Retries of collaborator calls, by operation"
    );

    tracing::info!("Booking metrics registered");
}

/// Record an applied transition.
pub fn record_transition(from: BookingState, to: BookingState) {
    metrics::counter!(
        "booking_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Record a rejected command.
pub fn record_state_violation(attempted: Transition) {
    metrics::counter!("booking_state_violations_total", "attempted" => attempted.as_str())
        .increment(1);
}

/// Record a detected conflict.
///
/// # Arguments
///
/// * `alternatives` - Number of slots offered to the losing booking
#[allow(clippy::cast_precision_loss)] // Slot counts are tiny
pub fn record_conflict(alternatives: usize) {
    metrics::counter!("booking_conflicts_total").increment(1);
    metrics::histogram!("booking_conflict_alternatives").record(alternatives as f64);
    tracing::debug!(alternatives, "Recorded conflict metric");
}

/// Record a collaborator call that gave up.
pub fn record_collaborator_failure(collaborator: Collaborator) {
    metrics::counter!(
        "booking_collaborator_failures_total",
        "collaborator" => collaborator.as_str()
    )
    .increment(1);
}
