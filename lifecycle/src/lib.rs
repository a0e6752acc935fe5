//! # Booking Lifecycle
//!
//! Lifecycle engine for tattoo studio bookings.
//!
//! A booking moves through
//!
//! ```text
//! idle ──create──▶ requested ──(delay)──▶ pending ──accept──▶ confirmed ──complete──▶ completed
//!                      │   └──────────confirm──────────────────▲   │
//!                      │                         pending──confirm─┘ │
//!                      └──────────────cancel──────▶ cancelled ◀─────┘
//! ```
//!
//! and every transition is recorded in an append-only [`ledger`].
//!
//! ## Layers
//!
//! - [`machine`]: pure reducer deciding which transition a command produces
//! - [`orchestrator`]: locks, persistence, retries and effect execution
//! - [`consent`] and [`review`]: gates that guard creation and reviews
//! - [`conflict`]: first-confirmed-wins resolution with alternative slots
//! - [`providers`]: collaborator traits; [`mocks`] has in-memory versions
//!
//! ## Example
//!
//! ```ignore
//! let orchestrator = BookingOrchestrator::new(EngineConfig::from_env(), collaborators);
//!
//! orchestrator.agree_legal_terms(&customer, "2024-01", "I agree")?;
//! let booking = orchestrator
//!     .create_booking_request(customer, artist, BookingDetails::at(date))
//!     .await?;
//!
//! match orchestrator.confirm_booking(booking.id, date, Money::new(300), 120).await? {
//!     ConfirmOutcome::Confirmed(booking) => println!("confirmed {}", booking.id),
//!     ConfirmOutcome::Conflict(conflict) => println!("try {:?}", conflict.alternatives.first()),
//! }
//! ```

pub mod config;
pub mod conflict;
pub mod consent;
pub mod error;
pub mod ledger;
pub mod machine;
pub mod metrics;
pub mod mocks;
pub mod orchestrator;
pub mod providers;
pub mod review;
pub mod types;

pub use config::EngineConfig;
pub use conflict::{AlternativeSlots, ConflictCase, ConflictOutcome, ConflictResolver};
pub use consent::LegalConsentGate;
pub use error::{BookingError, Collaborator, CollaboratorError, Result};
pub use ledger::{LedgerEntry, TransitionLedger};
pub use machine::{BookingAction, BookingMachine};
pub use orchestrator::{BookingOrchestrator, Collaborators, ConfirmOutcome};
pub use types::{
    Actor, ArtistId, Booking, BookingDetails, BookingId, BookingState, ConsentRecord, CustomerId,
    LegalConsentState, Money, Participant, ReviewPayload, ReviewState, TimeWindow, Transition,
};
