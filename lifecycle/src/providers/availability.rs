//! Artist availability.

use super::CollaboratorFuture;
use crate::types::{ArtistId, TimeWindow};
use chrono::{DateTime, Utc};

/// Search range for free slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    /// Artist whose calendar is searched
    pub artist_id: ArtistId,
    /// Earliest start (inclusive)
    pub from: DateTime<Utc>,
    /// Latest start (inclusive)
    pub until: DateTime<Utc>,
    /// Length of the session that must fit
    pub duration_minutes: u32,
}

/// Calendar owned by an external system.
///
/// Overlap detection is delegated here rather than computed by the engine,
/// so studio-specific rules (buffers, breaks, multiple chairs) stay outside.
pub trait AvailabilityProvider: Send + Sync {
    /// Whether the two windows collide in `artist_id`'s calendar.
    fn windows_overlap(
        &self,
        artist_id: ArtistId,
        first: TimeWindow,
        second: TimeWindow,
    ) -> CollaboratorFuture<'_, bool>;

    /// Candidate start times within `query` that are free.
    fn free_slots(&self, query: SlotQuery) -> CollaboratorFuture<'_, Vec<DateTime<Utc>>>;
}
