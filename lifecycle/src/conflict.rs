//! Resolution of competing bookings for the same artist slot.
//!
//! The first valid confirmation wins. The other booking is left as it is and
//! is offered a short list of nearby free slots instead; the caller decides
//! whether to re-confirm on one of them or cancel.

use crate::config::EngineConfig;
use crate::error::{BookingError, Collaborator, CollaboratorError, Result};
use crate::metrics;
use crate::providers::{AvailabilityProvider, SlotQuery};
use crate::types::{ArtistId, Booking, BookingId, BookingState, TimeWindow};
use booking_engine_runtime::{RetryPolicy, retry_with_predicate};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Two bookings competing for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCase {
    /// Booking whose confirmation triggered detection
    pub booking_id: BookingId,
    /// Booking it collides with
    pub competitor_id: BookingId,
    /// Artist both bookings are with
    pub artist_id: ArtistId,
    /// When the conflict was detected
    pub detected_at: DateTime<Utc>,
}

/// Ordered, de-duplicated alternative start times.
///
/// Cloning is cheap; iteration can be restarted any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlternativeSlots {
    slots: Arc<[DateTime<Utc>]>,
}

impl AlternativeSlots {
    /// Wrap an already ordered list.
    #[must_use]
    pub fn new(slots: Vec<DateTime<Utc>>) -> Self {
        Self {
            slots: slots.into(),
        }
    }

    /// Iterate the slots, best candidate first.
    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> + '_ {
        self.slots.iter()
    }

    /// Best candidate.
    #[must_use]
    pub fn first(&self) -> Option<DateTime<Utc>> {
        self.slots.first().copied()
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no alternative was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a> IntoIterator for &'a AlternativeSlots {
    type Item = &'a DateTime<Utc>;
    type IntoIter = std::slice::Iter<'a, DateTime<Utc>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// How a conflict was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOutcome {
    /// The detected collision
    pub case: ConflictCase,
    /// Booking that keeps the slot
    pub winner: BookingId,
    /// Booking that must move or cancel
    pub loser: BookingId,
    /// Nearby free slots for the loser
    pub alternatives: AlternativeSlots,
}

/// Pick the booking that keeps the slot: `(winner, loser)`.
///
/// A confirmed booking beats an unconfirmed one; between two confirmed
/// bookings the earlier confirmation wins, and a tie goes to `first`.
///
/// # Errors
///
/// [`BookingError::PreconditionFailed`] if the bookings are the same, belong
/// to different artists, or neither is confirmed.
pub fn decide_winner<'a>(
    first: &'a Booking,
    second: &'a Booking,
) -> Result<(&'a Booking, &'a Booking)> {
    if first.id == second.id {
        return Err(BookingError::precondition(
            "a booking cannot conflict with itself",
        ));
    }
    if first.artist_id != second.artist_id {
        return Err(BookingError::precondition(format!(
            "bookings are with different artists ({} and {})",
            first.artist_id, second.artist_id
        )));
    }

    let confirmed = |booking: &Booking| booking.state == BookingState::Confirmed;
    match (confirmed(first), confirmed(second)) {
        (true, true) => {
            let second_earlier = match (first.confirmed_at, second.confirmed_at) {
                (Some(a), Some(b)) => b < a,
                (None, Some(_)) => true,
                _ => false,
            };
            if second_earlier {
                Ok((second, first))
            } else {
                Ok((first, second))
            }
        },
        (true, false) => Ok((first, second)),
        (false, true) => Ok((second, first)),
        (false, false) => Err(BookingError::precondition(
            "neither booking holds a confirmed slot",
        )),
    }
}

/// Settles conflicts and looks up alternatives.
pub struct ConflictResolver {
    availability: Arc<dyn AvailabilityProvider>,
    policy: RetryPolicy,
    search_days: u32,
    max_alternatives: usize,
    default_duration: u32,
}

impl ConflictResolver {
    /// Resolver backed by `availability`.
    #[must_use]
    pub fn new(availability: Arc<dyn AvailabilityProvider>, config: &EngineConfig) -> Self {
        Self {
            availability,
            policy: config.retry_policy(),
            search_days: config.alternative_search_days,
            max_alternatives: config.max_alternatives,
            default_duration: config.default_duration_minutes,
        }
    }

    /// Settle a conflict between `booking` and `competitor`.
    ///
    /// Neither booking is modified.
    ///
    /// # Errors
    ///
    /// - [`BookingError::PreconditionFailed`], see [`decide_winner`].
    /// - [`BookingError::CollaboratorTimeout`] if the calendar cannot be queried.
    pub async fn resolve(
        &self,
        booking: &Booking,
        competitor: &Booking,
        detected_at: DateTime<Utc>,
    ) -> Result<ConflictOutcome> {
        let (winner, loser) = decide_winner(booking, competitor)?;
        let alternatives = self.alternatives(loser, winner, detected_at).await?;

        let outcome = ConflictOutcome {
            case: ConflictCase {
                booking_id: booking.id,
                competitor_id: competitor.id,
                artist_id: booking.artist_id.clone(),
                detected_at,
            },
            winner: winner.id,
            loser: loser.id,
            alternatives,
        };

        metrics::record_conflict(outcome.alternatives.len());
        tracing::warn!(
            booking_id = %outcome.case.booking_id,
            competitor_id = %outcome.case.competitor_id,
            artist_id = %outcome.case.artist_id,
            winner = %outcome.winner,
            alternatives = outcome.alternatives.len(),
            "Booking conflict resolved"
        );
        Ok(outcome)
    }

    /// Free slots near `loser`'s preferred date that do not collide with
    /// `winner`, closest first.
    ///
    /// # Errors
    ///
    /// [`BookingError::CollaboratorTimeout`] if the calendar cannot be queried.
    pub async fn alternatives(
        &self,
        loser: &Booking,
        winner: &Booking,
        not_before: DateTime<Utc>,
    ) -> Result<AlternativeSlots> {
        let wanted = loser.window(self.default_duration);
        let taken = winner.window(self.default_duration);
        let spread = Duration::days(i64::from(self.search_days));
        let query = SlotQuery {
            artist_id: loser.artist_id.clone(),
            from: loser.preferred_date - spread,
            until: loser.preferred_date + spread,
            duration_minutes: wanted.duration_minutes,
        };

        let mut candidates = retry_with_predicate(
            &self.policy,
            "free_slots",
            || self.availability.free_slots(query.clone()),
            CollaboratorError::is_transient,
        )
        .await
        .map_err(|error| {
            metrics::record_collaborator_failure(Collaborator::Availability);
            BookingError::collaborator(Collaborator::Availability, &error)
        })?;

        candidates.sort_unstable();
        candidates.dedup();
        candidates.retain(|start| {
            *start >= not_before
                && !taken.overlaps(&TimeWindow::new(*start, wanted.duration_minutes))
        });
        candidates.sort_by_key(|start| (*start - loser.preferred_date).num_seconds().abs());
        candidates.truncate(self.max_alternatives);

        Ok(AlternativeSlots::new(candidates))
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("search_days", &self.search_days)
            .field("max_alternatives", &self.max_alternatives)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockAvailability;
    use crate::types::{CustomerId, LegalConsentState, ReviewState};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn booking(customer: &str, state: BookingState, confirmed_at: Option<DateTime<Utc>>) -> Booking {
        Booking {
            id: BookingId::new(),
            customer_id: CustomerId::new(customer),
            artist_id: ArtistId::new("ink-master"),
            preferred_date: at(10, 14),
            requested_duration: Some(60),
            description: String::new(),
            confirmed_date: confirmed_at.map(|_| at(10, 14)),
            confirmed_duration: confirmed_at.map(|_| 60),
            confirmed_price: None,
            state,
            review_state: ReviewState::Locked,
            visited_studio: false,
            legal_consent: LegalConsentState::Agreed,
            consent_version: None,
            consent_agreed_at: None,
            created_at: at(1, 9),
            updated_at: at(1, 9),
            confirmed_at,
            cancellation_reason: None,
        }
    }

    fn resolver(calendar: MockAvailability) -> ConflictResolver {
        let config = EngineConfig {
            retry_max_attempts: 1,
            ..EngineConfig::default()
        };
        ConflictResolver::new(Arc::new(calendar), &config)
    }

    #[test]
    fn test_confirmed_booking_wins() {
        let confirmed = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let pending = booking("bob", BookingState::Pending, None);

        let (winner, loser) = decide_winner(&pending, &confirmed).unwrap();
        assert_eq!(winner.id, confirmed.id);
        assert_eq!(loser.id, pending.id);
    }

    #[test]
    fn test_earlier_confirmation_wins() {
        let early = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let late = booking("bob", BookingState::Confirmed, Some(at(3, 9)));

        let (winner, _) = decide_winner(&late, &early).unwrap();
        assert_eq!(winner.id, early.id);
    }

    #[test]
    fn test_no_confirmed_party_is_rejected() {
        let a = booking("alice", BookingState::Pending, None);
        let b = booking("bob", BookingState::Requested, None);
        assert!(matches!(
            decide_winner(&a, &b),
            Err(BookingError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn test_different_artists_are_rejected() {
        let a = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let mut b = booking("bob", BookingState::Pending, None);
        b.artist_id = ArtistId::new("someone-else");
        assert!(decide_winner(&a, &b).is_err());
    }

    #[tokio::test]
    async fn test_alternatives_are_closest_first_and_bounded() {
        let calendar = MockAvailability::new(10, 18, 60);
        let winner = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let loser = booking("bob", BookingState::Pending, None);

        let outcome = resolver(calendar)
            .resolve(&loser, &winner, at(1, 0))
            .await
            .unwrap();

        assert_eq!(outcome.winner, winner.id);
        assert_eq!(outcome.loser, loser.id);
        assert_eq!(outcome.alternatives.len(), 5);
        // 14:00 on the 10th is taken by the winner; 13:00 and 15:00 are closest.
        let slots: Vec<_> = outcome.alternatives.iter().copied().collect();
        assert!(!slots.contains(&at(10, 14)));
        assert!(slots[..2].contains(&at(10, 13)));
        assert!(slots[..2].contains(&at(10, 15)));
        // Restartable.
        assert_eq!(outcome.alternatives.iter().count(), 5);
    }

    #[tokio::test]
    async fn test_fully_booked_calendar_yields_no_alternatives() {
        let calendar = MockAvailability::new(10, 18, 60);
        let artist = ArtistId::new("ink-master");
        for day in 3..=17 {
            calendar.block(&artist, TimeWindow::new(at(day, 0), 24 * 60));
        }
        let winner = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let loser = booking("bob", BookingState::Pending, None);

        let outcome = resolver(calendar)
            .resolve(&loser, &winner, at(1, 0))
            .await
            .unwrap();

        assert!(outcome.alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_calendar_is_a_collaborator_timeout() {
        let calendar = MockAvailability::default();
        calendar.set_unavailable(true);
        let winner = booking("alice", BookingState::Confirmed, Some(at(2, 9)));
        let loser = booking("bob", BookingState::Pending, None);

        let result = resolver(calendar).resolve(&loser, &winner, at(1, 0)).await;

        assert!(matches!(
            result,
            Err(BookingError::CollaboratorTimeout {
                collaborator: Collaborator::Availability,
                ..
            })
        ));
    }
}
