//! In-memory review storage.

use crate::error::CollaboratorError;
use crate::providers::{CollaboratorFuture, ReviewStore, SubmittedReview};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Review store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    reviews: Mutex<Vec<SubmittedReview>>,
    failing: AtomicBool,
}

impl InMemoryReviewStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch failure injection on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stored reviews.
    #[must_use]
    pub fn reviews(&self) -> Vec<SubmittedReview> {
        self.reviews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReviewStore for InMemoryReviewStore {
    fn store_review(&self, review: SubmittedReview) -> CollaboratorFuture<'_, ()> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CollaboratorError::Unavailable(
                    "review storage offline".to_string(),
                ));
            }
            self.reviews
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(review);
            Ok(())
        })
    }
}
