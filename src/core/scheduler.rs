//! Prayer-window state machine.
//!
//! [`evaluate`] maps `(now, schedule, config)` to the screen that should be
//! visible. It keeps no state between calls: the core loop re-evaluates from
//! scratch on every tick, so clock jumps and schedule swaps need no special
//! handling.
//!
//! For each congregational prayer with call instant `C` and congregation
//! instant `I = C + offset`, the activity window is split as follows:
//!
//! ```text
//! C-5 ─ pre-call ─ C ─ call ─ C+3 ─ post-call ─ C+3.5 ─ interval ─ I
//! I ─ congregation-start ─ I+1 ─ in-prayer ─ I+1+pd ─ remembrance ─ I+1+pd+rd
//! ```
//!
//! Outside every window the dashboard is shown.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::demo::DemoSequencer;
use super::screen::ScreenState;
use crate::common::constants::*;
use crate::config::Config;
use crate::prayer::{DailySchedule, PrayerName, PrayerTime};
use crate::time::source::TimeSource;

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub now: DateTime<Utc>,
    pub schedule: Arc<DailySchedule>,
    pub next_upcoming: Option<PrayerTime>,
    pub active_prayer: Option<PrayerTime>,
    pub screen_state: ScreenState,
    /// Never negative
    pub time_remaining: Duration,
}

impl SchedulerSnapshot {
    pub fn time_remaining_ms(&self) -> i64 {
        self.time_remaining.num_milliseconds()
    }
}

/// One sub-window of a prayer's activity window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubWindow {
    pub state: ScreenState,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Instant the countdown on this screen runs to
    pub target: DateTime<Utc>,
}

/// Fractional minutes as a duration, rounded to the millisecond.
pub fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}

/// The seven sub-windows of `prayer`, in chronological order.
pub fn sub_windows(prayer: &PrayerTime, config: &Config) -> [SubWindow; 7] {
    let call = prayer.instant;
    let congregation = prayer.congregation_instant();
    let prayer_start = congregation + minutes(CONGREGATION_START_MINUTES);
    let prayer_end = prayer_start + minutes(config.prayer_duration());
    let remembrance_end = prayer_end + minutes(config.remembrance_duration());

    let window = |state, start, end, target| SubWindow {
        state,
        start,
        end,
        target,
    };

    [
        window(ScreenState::PreCall, call - minutes(PRE_CALL_MINUTES), call, call),
        window(ScreenState::Call, call, call + minutes(CALL_MINUTES), congregation),
        window(
            ScreenState::PostCallSupplication,
            call + minutes(CALL_MINUTES),
            call + minutes(POST_CALL_END_MINUTES),
            congregation,
        ),
        window(
            ScreenState::Interval,
            call + minutes(POST_CALL_END_MINUTES),
            congregation,
            congregation,
        ),
        window(
            ScreenState::CongregationStart,
            congregation,
            prayer_start,
            prayer_end,
        ),
        window(ScreenState::InPrayer, prayer_start, prayer_end, prayer_end),
        window(
            ScreenState::Remembrance,
            prayer_end,
            remembrance_end,
            remembrance_end,
        ),
    ]
}

/// Evaluate the screen state at `now`.
pub fn evaluate(
    now: DateTime<Utc>,
    schedule: &Arc<DailySchedule>,
    config: &Config,
) -> SchedulerSnapshot {
    let next_upcoming = schedule.next_upcoming(now).cloned();

    for name in PrayerName::CONGREGATIONAL {
        let prayer = schedule.get(name);
        // Sub-windows can be empty (zero offset), so search them in order
        if let Some(window) = sub_windows(prayer, config)
            .iter()
            .find(|w| w.start <= now && now < w.end)
        {
            return SchedulerSnapshot {
                now,
                schedule: Arc::clone(schedule),
                next_upcoming,
                active_prayer: Some(prayer.clone()),
                screen_state: window.state,
                time_remaining: non_negative(window.target - now),
            };
        }
    }

    let time_remaining = next_upcoming
        .as_ref()
        .map(|p| non_negative(p.instant - now))
        .unwrap_or_else(Duration::zero);

    SchedulerSnapshot {
        now,
        schedule: Arc::clone(schedule),
        next_upcoming,
        active_prayer: None,
        screen_state: ScreenState::Dashboard,
        time_remaining,
    }
}

fn non_negative(duration: Duration) -> Duration {
    duration.max(Duration::zero())
}

/// How the scheduler obtains its screen state.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockMode {
    /// Follow the time source
    Live,
    /// Step through screens on request
    Demo(DemoSequencer),
}

/// Clock-mode aware front end to [`evaluate`].
pub struct Scheduler {
    mode: ClockMode,
    time_source: Arc<dyn TimeSource>,
}

impl Scheduler {
    pub fn new(time_source: Arc<dyn TimeSource>, mode: ClockMode) -> Self {
        Self { mode, time_source }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.mode, ClockMode::Demo(_))
    }

    /// Current snapshot for `schedule`.
    pub fn snapshot(&self, schedule: &Arc<DailySchedule>, config: &Config) -> SchedulerSnapshot {
        let now = self.time_source.now();
        match &self.mode {
            ClockMode::Live => evaluate(now, schedule, config),
            ClockMode::Demo(sequencer) => sequencer.snapshot(now, schedule, config),
        }
    }

    /// Step the demo forward. Returns `false` in live mode.
    pub fn request_demo_advance(&mut self) -> bool {
        match &mut self.mode {
            ClockMode::Live => false,
            ClockMode::Demo(sequencer) => {
                sequencer.advance();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::source::MockTimeSource;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Asia::Riyadh;

    fn schedule() -> Arc<DailySchedule> {
        let date = NaiveDate::from_ymd_opt(2024, 7, 8).unwrap();
        let times = [(4, 43), (6, 7), (12, 27), (15, 45), (18, 48), (20, 18)]
            .map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
        Arc::new(DailySchedule::from_wall_clock(date, times, Riyadh, &Config::default()).unwrap())
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Riyadh
            .with_ymd_and_hms(2024, 7, 8, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_minutes_handles_fractions() {
        assert_eq!(minutes(3.5), Duration::seconds(210));
        assert_eq!(minutes(8.5), Duration::seconds(510));
    }

    #[test]
    fn test_sunrise_never_activates() {
        let snapshot = evaluate(at(6, 7, 0), &schedule(), &Config::default());
        assert_eq!(snapshot.screen_state, ScreenState::Dashboard);
        assert_eq!(snapshot.next_upcoming.unwrap().name, PrayerName::Dhuhr);
    }

    #[test]
    fn test_dashboard_counts_down_to_next_prayer() {
        let snapshot = evaluate(at(10, 0, 0), &schedule(), &Config::default());
        assert_eq!(snapshot.screen_state, ScreenState::Dashboard);
        assert!(snapshot.active_prayer.is_none());
        assert_eq!(snapshot.time_remaining, Duration::minutes(147));
    }

    #[test]
    fn test_after_last_window_remaining_is_zero() {
        let snapshot = evaluate(at(23, 0, 0), &schedule(), &Config::default());
        assert_eq!(snapshot.screen_state, ScreenState::Dashboard);
        assert!(snapshot.next_upcoming.is_none());
        assert_eq!(snapshot.time_remaining, Duration::zero());
    }

    #[test]
    fn test_zero_offset_skips_interval() {
        let config = Config {
            congregation_offsets: Some(crate::config::CongregationOffsets {
                maghrib: Some(0),
                ..Default::default()
            }),
            ..Config::default()
        };
        let schedule = Arc::new(schedule().with_congregation_offsets(&config));

        // Congregation starts with the call; the congregation-start screen is
        // shadowed by the call screen, which counts down to zero
        let snapshot = evaluate(at(18, 48, 30), &schedule, &config);
        assert_eq!(snapshot.screen_state, ScreenState::Call);
        assert_eq!(snapshot.time_remaining, Duration::zero());
    }

    #[test]
    fn test_scheduler_live_mode_reads_time_source() {
        let mut clock = MockTimeSource::new();
        clock.expect_now().returning(|| at(12, 28, 0));
        let mut scheduler = Scheduler::new(Arc::new(clock), ClockMode::Live);

        let snapshot = scheduler.snapshot(&schedule(), &Config::default());
        assert_eq!(snapshot.screen_state, ScreenState::Call);
        assert_eq!(snapshot.active_prayer.unwrap().name, PrayerName::Dhuhr);
        assert!(!scheduler.request_demo_advance());
    }

    #[test]
    fn test_scheduler_demo_mode_ignores_clock() {
        let mut clock = MockTimeSource::new();
        clock.expect_now().returning(|| at(10, 0, 0));
        let mut scheduler = Scheduler::new(Arc::new(clock), ClockMode::Demo(DemoSequencer::new()));

        assert!(scheduler.request_demo_advance());
        let snapshot = scheduler.snapshot(&schedule(), &Config::default());
        assert_eq!(snapshot.screen_state, ScreenState::PreCall);
        assert_eq!(snapshot.active_prayer.unwrap().name, PrayerName::Fajr);
    }
}
