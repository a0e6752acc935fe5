//! Collaborator interfaces.
//!
//! The engine never owns storage, calendars or messaging. It talks to them
//! through the traits in this module, and every call is wrapped in a timeout
//! and retry by the caller.
//!
//! ```text
//! ┌────────────────────┐     ┌──────────────────────┐
//! │ BookingOrchestrator│────▶│ BookingRepository    │ bookings + ledger mirror
//! │                    │────▶│ AvailabilityProvider │ overlap + free slots
//! │                    │────▶│ ReviewStore          │ review content
//! └─────────┬──────────┘     └──────────────────────┘
//!           │ effects
//!           ▼
//! ┌────────────────────┐
//! │ Notifier           │ customer / artist messages
//! └────────────────────┘
//! ```
//!
//! Implementations return boxed futures so they can be shared as
//! `Arc<dyn Trait>`. See [`crate::mocks`] for in-memory versions.

mod availability;
mod notifier;
mod repository;
mod review_store;

pub use availability::{AvailabilityProvider, SlotQuery};
pub use notifier::{Notification, NotificationKind, Notifier};
pub use repository::BookingRepository;
pub use review_store::{ReviewStore, SubmittedReview};

use crate::error::CollaboratorError;
use std::future::Future;
use std::pin::Pin;

/// Future returned by every collaborator call.
pub type CollaboratorFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, CollaboratorError>> + Send + 'a>>;
