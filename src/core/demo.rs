//! Demo clock mode: walks every screen of every prayer on request.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::scheduler::{SchedulerSnapshot, sub_windows};
use super::screen::ScreenState;
use crate::config::Config;
use crate::prayer::{DailySchedule, PrayerName};

/// Position in the demo rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DemoSequencer {
    state_index: usize,
    prayer_index: usize,
}

impl DemoSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen_state(&self) -> ScreenState {
        ScreenState::SEQUENCE[self.state_index]
    }

    pub fn prayer(&self) -> PrayerName {
        PrayerName::CONGREGATIONAL[self.prayer_index]
    }

    /// Step to the next screen. Wrapping back to the dashboard moves on to
    /// the next prayer; returns `true` when that happens.
    pub fn advance(&mut self) -> bool {
        self.state_index = (self.state_index + 1) % ScreenState::SEQUENCE.len();
        if self.state_index == 0 {
            self.prayer_index = (self.prayer_index + 1) % PrayerName::CONGREGATIONAL.len();
            true
        } else {
            false
        }
    }

    /// Snapshot showing the demo screen for the demo prayer.
    ///
    /// The countdown shows the full length of the screen's countdown, as if
    /// the screen had just appeared.
    pub fn snapshot(
        &self,
        now: DateTime<Utc>,
        schedule: &Arc<DailySchedule>,
        config: &Config,
    ) -> SchedulerSnapshot {
        let prayer = schedule.get(self.prayer()).clone();
        let state = self.screen_state();

        let time_remaining = match sub_windows(&prayer, config)
            .iter()
            .find(|w| w.state == state)
        {
            Some(window) => window.target - window.start,
            None => prayer.instant - now,
        }
        .max(Duration::zero());

        SchedulerSnapshot {
            now,
            schedule: Arc::clone(schedule),
            next_upcoming: Some(prayer.clone()),
            active_prayer: (state != ScreenState::Dashboard).then_some(prayer),
            screen_state: state,
            time_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_advances_prayer_by_one() {
        let mut demo = DemoSequencer::new();
        assert_eq!(demo.prayer(), PrayerName::Fajr);

        for _ in 0..7 {
            assert!(!demo.advance());
        }
        assert_eq!(demo.screen_state(), ScreenState::Remembrance);
        assert_eq!(demo.prayer(), PrayerName::Fajr);

        assert!(demo.advance());
        assert_eq!(demo.screen_state(), ScreenState::Dashboard);
        assert_eq!(demo.prayer(), PrayerName::Dhuhr);
    }

    #[test]
    fn test_prayer_rotation_wraps_after_isha() {
        let mut demo = DemoSequencer::new();
        for _ in 0..(8 * 5) {
            demo.advance();
        }
        assert_eq!(demo, DemoSequencer::new());
    }

    #[test]
    fn test_dashboard_names_demo_prayer_as_next_only() {
        let config = Config::default();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 7, 8).unwrap();
        let times = [(4, 30), (5, 50), (12, 20), (15, 40), (18, 30), (20, 0)]
            .map(|(h, m)| chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap());
        let schedule = Arc::new(
            DailySchedule::from_wall_clock(date, times, chrono_tz::Asia::Riyadh, &config).unwrap(),
        );
        let now = schedule.get(PrayerName::Asr).instant;

        let mut demo = DemoSequencer::new();
        let dashboard = demo.snapshot(now, &schedule, &config);
        assert_eq!(dashboard.screen_state, ScreenState::Dashboard);
        assert!(dashboard.active_prayer.is_none());
        assert_eq!(dashboard.next_upcoming.unwrap().name, PrayerName::Fajr);

        demo.advance();
        let pre_call = demo.snapshot(now, &schedule, &config);
        assert_eq!(pre_call.active_prayer.unwrap().name, PrayerName::Fajr);
        assert_eq!(pre_call.time_remaining, Duration::minutes(5));
    }
}
