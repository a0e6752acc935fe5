//! Review content storage.

use super::CollaboratorFuture;
use crate::types::{ArtistId, BookingId, CustomerId, ReviewPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review as handed to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedReview {
    /// Reviewed booking
    pub booking_id: BookingId,
    /// Author
    pub customer_id: CustomerId,
    /// Reviewed artist
    pub artist_id: ArtistId,
    /// Rating and text
    pub payload: ReviewPayload,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
}

/// Stores review content.
pub trait ReviewStore: Send + Sync {
    /// Persist a review.
    fn store_review(&self, review: SubmittedReview) -> CollaboratorFuture<'_, ()>;
}
