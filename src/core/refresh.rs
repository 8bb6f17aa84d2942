//! Bookkeeping for background schedule refreshes.

use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::common::constants::{REFRESH_HOUR, REFRESH_MINUTE};
use crate::prayer::resolve_local;

/// Tracks the daily rollover deadline and which refresh result is current.
///
/// Every started refresh gets a new generation; only the result carrying the
/// latest generation is accepted, so a slow request started before a config
/// reload can never overwrite the newer schedule.
#[derive(Debug, Clone)]
pub struct RefreshTracker {
    generation: u64,
    in_flight: bool,
    next_rollover: DateTime<Utc>,
}

impl RefreshTracker {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            generation: 0,
            in_flight: false,
            next_rollover: next_rollover(now, tz),
        }
    }

    /// Start a refresh and return its generation.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = true;
        self.generation
    }

    /// Whether a result of `generation` should be applied.
    pub fn accept(&mut self, generation: u64) -> bool {
        if generation == self.generation {
            self.in_flight = false;
            true
        } else {
            false
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn next_rollover(&self) -> DateTime<Utc> {
        self.next_rollover
    }

    /// True once the rollover deadline has passed; re-arms the deadline.
    pub fn take_rollover(&mut self, now: DateTime<Utc>, tz: Tz) -> bool {
        if now >= self.next_rollover {
            self.next_rollover = next_rollover(now, tz);
            true
        } else {
            false
        }
    }

    /// Recompute the deadline, e.g. after the timezone changed.
    pub fn rearm(&mut self, now: DateTime<Utc>, tz: Tz) {
        self.next_rollover = next_rollover(now, tz);
    }
}

/// Next local refresh time (00:05) strictly after `now`.
pub fn next_rollover(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let refresh_time =
        NaiveTime::from_hms_opt(REFRESH_HOUR, REFRESH_MINUTE, 0).unwrap_or(NaiveTime::MIN);
    let today = now.with_timezone(&tz).date_naive();

    let candidate = resolve_local(tz, today.and_time(refresh_time));
    if candidate > now {
        return candidate;
    }
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    resolve_local(tz, tomorrow.and_time(refresh_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Riyadh;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Riyadh
            .with_ymd_and_hms(2024, 7, d, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_next_rollover_before_and_after_refresh_time() {
        assert_eq!(next_rollover(at(8, 0, 1), Riyadh), at(8, 0, 5));
        assert_eq!(next_rollover(at(8, 0, 5), Riyadh), at(9, 0, 5));
        assert_eq!(next_rollover(at(8, 23, 59), Riyadh), at(9, 0, 5));
    }

    #[test]
    fn test_take_rollover_fires_once_and_rearms() {
        let mut tracker = RefreshTracker::new(at(8, 12, 0), Riyadh);
        assert!(!tracker.take_rollover(at(8, 23, 0), Riyadh));
        assert!(tracker.take_rollover(at(9, 0, 6), Riyadh));
        assert!(!tracker.take_rollover(at(9, 0, 7), Riyadh));
        assert_eq!(tracker.next_rollover(), at(10, 0, 5));
    }

    #[test]
    fn test_clock_jump_backwards_keeps_deadline() {
        let mut tracker = RefreshTracker::new(at(8, 12, 0), Riyadh);
        assert!(!tracker.take_rollover(at(7, 12, 0), Riyadh));
        assert_eq!(tracker.next_rollover(), at(9, 0, 5));
    }

    #[test]
    fn test_only_latest_generation_accepted() {
        let mut tracker = RefreshTracker::new(at(8, 12, 0), Riyadh);
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(!tracker.accept(first));
        assert!(tracker.is_in_flight());
        assert!(tracker.accept(second));
        assert!(!tracker.is_in_flight());
    }
}
