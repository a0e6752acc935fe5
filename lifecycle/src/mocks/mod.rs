//! In-memory collaborator implementations.
//!
//! Used by the unit and integration tests and by the demo binary. Each mock
//! supports failure injection so retry and timeout paths can be exercised
//! deterministically.

mod availability;
mod notifier;
mod repository;
mod review_store;

pub use availability::MockAvailability;
pub use notifier::RecordingNotifier;
pub use repository::InMemoryBookingRepository;
pub use review_store::InMemoryReviewStore;

use std::sync::atomic::{AtomicU32, Ordering};

/// Consume one injected failure, if any are left.
fn take_failure(remaining: &AtomicU32) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
