//! Calendar with fixed opening hours and blocked windows.

use crate::error::CollaboratorError;
use crate::providers::{AvailabilityProvider, CollaboratorFuture, SlotQuery};
use crate::types::{ArtistId, TimeWindow};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Artist calendar open `opening_hour..closing_hour` every day, offering
/// slots every `step_minutes`.
#[derive(Debug)]
pub struct MockAvailability {
    busy: RwLock<HashMap<ArtistId, Vec<TimeWindow>>>,
    opening_hour: u32,
    closing_hour: u32,
    step_minutes: u32,
    unavailable: AtomicBool,
}

impl Default for MockAvailability {
    fn default() -> Self {
        Self::new(10, 20, 60)
    }
}

impl MockAvailability {
    /// Calendar open from `opening_hour` to `closing_hour` (UTC).
    #[must_use]
    pub fn new(opening_hour: u32, closing_hour: u32, step_minutes: u32) -> Self {
        Self {
            busy: RwLock::new(HashMap::new()),
            opening_hour,
            closing_hour,
            step_minutes: step_minutes.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Mark `window` as taken for `artist_id`.
    pub fn block(&self, artist_id: &ArtistId, window: TimeWindow) {
        self.busy
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(artist_id.clone())
            .or_default()
            .push(window);
    }

    /// Make every call fail with [`CollaboratorError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CollaboratorError::Unavailable(
                "calendar service unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn slots(&self, query: &SlotQuery) -> Vec<DateTime<Utc>> {
        let busy = self.busy.read().unwrap_or_else(PoisonError::into_inner);
        let blocked = busy.get(&query.artist_id).map_or(&[][..], Vec::as_slice);

        let mut slots = Vec::new();
        let mut day = query.from.date_naive();
        let last_day = query.until.date_naive();
        let open = self.opening_hour * 60;
        let close = self.closing_hour * 60;

        while day <= last_day {
            let mut minute = open;
            while minute + query.duration_minutes <= close {
                let start = day
                    .and_hms_opt(minute / 60, minute % 60, 0)
                    .map(|naive| naive.and_utc());
                if let Some(start) = start {
                    let candidate = TimeWindow::new(start, query.duration_minutes);
                    if start >= query.from
                        && start <= query.until
                        && !blocked.iter().any(|taken| taken.overlaps(&candidate))
                    {
                        slots.push(start);
                    }
                }
                minute += self.step_minutes;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        slots
    }
}

impl AvailabilityProvider for MockAvailability {
    fn windows_overlap(
        &self,
        _artist_id: ArtistId,
        first: TimeWindow,
        second: TimeWindow,
    ) -> CollaboratorFuture<'_, bool> {
        Box::pin(async move {
            self.check_reachable()?;
            Ok(first.overlaps(&second))
        })
    }

    fn free_slots(&self, query: SlotQuery) -> CollaboratorFuture<'_, Vec<DateTime<Utc>>> {
        Box::pin(async move {
            self.check_reachable()?;
            Ok(self.slots(&query))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_free_slots_skip_blocked_windows() {
        let calendar = MockAvailability::new(10, 14, 60);
        let artist = ArtistId::new("ink-master");
        calendar.block(&artist, TimeWindow::new(day_at(11), 60));

        let slots = calendar
            .free_slots(SlotQuery {
                artist_id: artist,
                from: day_at(0),
                until: day_at(23),
                duration_minutes: 60,
            })
            .await
            .unwrap();

        assert_eq!(slots, vec![day_at(10), day_at(12), day_at(13)]);
    }

    #[tokio::test]
    async fn test_unreachable_calendar_fails() {
        let calendar = MockAvailability::default();
        calendar.set_unavailable(true);

        let result = calendar
            .windows_overlap(
                ArtistId::new("a"),
                TimeWindow::new(day_at(10), 60),
                TimeWindow::new(day_at(10), 60),
            )
            .await;

        assert!(matches!(result, Err(CollaboratorError::Unavailable(_))));
    }
}
