//! Frames handed to the screen and the renderers that show them.
//!
//! The core loop builds one [`DisplayFrame`] per tick from the scheduler
//! snapshot. A [`Renderer`] decides what to do with it; the bundled
//! [`ConsoleRenderer`] prints a line whenever the visible screen changes.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::common::utils::format_time_remaining;
use crate::core::scheduler::SchedulerSnapshot;
use crate::core::screen::ScreenState;
use crate::prayer::{DailySchedule, PrayerName, PrayerTime};

/// Everything a screen needs to draw itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub current_time: DateTime<Utc>,
    pub todays_schedule: Arc<DailySchedule>,
    pub next_upcoming: Option<PrayerTime>,
    pub active_prayer: Option<PrayerTime>,
    pub screen_state: ScreenState,
    pub time_remaining_ms: i64,
    pub hijri_label: String,
    /// Shown on the dashboard once isha has passed
    pub tomorrow_fajr: Option<PrayerTime>,
    pub demo: bool,
}

impl DisplayFrame {
    pub fn from_snapshot(
        snapshot: SchedulerSnapshot,
        hijri_label: String,
        tomorrow_fajr: Option<PrayerTime>,
        demo: bool,
    ) -> Self {
        let time_remaining_ms = snapshot.time_remaining_ms();
        Self {
            current_time: snapshot.now,
            todays_schedule: snapshot.schedule,
            next_upcoming: snapshot.next_upcoming,
            active_prayer: snapshot.active_prayer,
            screen_state: snapshot.screen_state,
            time_remaining_ms,
            hijri_label,
            tomorrow_fajr,
            demo,
        }
    }

    /// Prayer the countdown refers to.
    pub fn countdown_prayer(&self) -> Option<&PrayerTime> {
        self.active_prayer
            .as_ref()
            .or(self.next_upcoming.as_ref())
            .or(self.tomorrow_fajr.as_ref())
    }

    /// Countdown as shown on screen. After isha it runs to tomorrow's fajr.
    pub fn countdown(&self) -> String {
        match (&self.active_prayer, &self.next_upcoming, &self.tomorrow_fajr) {
            (None, None, Some(fajr)) if !self.demo => {
                format_time_remaining((fajr.instant - self.current_time).num_milliseconds())
            }
            _ => format_time_remaining(self.time_remaining_ms),
        }
    }
}

/// Output side of the core loop.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    /// Called once per tick with the current frame.
    fn render(&mut self, frame: &DisplayFrame);

    /// Called after a configuration reload.
    fn reconfigure(&mut self, _config: &crate::config::Config) {}

    /// Called once when the loop exits.
    fn shutdown(&mut self) {}
}

/// Logs screen changes to the terminal.
pub struct ConsoleRenderer {
    tz: Tz,
    debug_enabled: bool,
    last_state: Option<ScreenState>,
    last_prayer: Option<PrayerName>,
    last_date: Option<chrono::NaiveDate>,
}

impl ConsoleRenderer {
    pub fn new(tz: Tz, debug_enabled: bool) -> Self {
        Self {
            tz,
            debug_enabled,
            last_state: None,
            last_prayer: None,
            last_date: None,
        }
    }

    fn local_hm(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%H:%M").to_string()
    }

    fn log_schedule(&self, frame: &DisplayFrame) {
        log_block_start!(
            "Prayer times for {} ({})",
            frame.todays_schedule.date().format("%Y-%m-%d"),
            frame.hijri_label
        );
        for prayer in frame.todays_schedule.iter() {
            if prayer.name.is_congregational() {
                log_indented!(
                    "{:<8} {}  congregation {}",
                    prayer.display_name,
                    self.local_hm(prayer.instant),
                    self.local_hm(prayer.congregation_instant())
                );
            } else {
                log_indented!("{:<8} {}", prayer.display_name, self.local_hm(prayer.instant));
            }
        }
    }

    fn describe(&self, frame: &DisplayFrame) -> String {
        match (frame.screen_state, frame.countdown_prayer()) {
            (ScreenState::Dashboard, Some(prayer)) => format!(
                "{} | next: {} at {} in {}",
                frame.screen_state,
                prayer.display_name,
                self.local_hm(prayer.instant),
                frame.countdown()
            ),
            (state, Some(prayer)) => format!(
                "{} | {} ({}) {}",
                state,
                prayer.display_name,
                prayer.name.arabic_name(),
                frame.countdown()
            ),
            (state, None) => state.to_string(),
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, frame: &DisplayFrame) {
        let date = frame.todays_schedule.date();
        if self.last_date != Some(date) {
            self.log_schedule(frame);
            self.last_date = Some(date);
        }

        let prayer = frame.active_prayer.as_ref().map(|p| p.name);
        if self.last_state == Some(frame.screen_state) && self.last_prayer == prayer {
            return;
        }
        self.last_state = Some(frame.screen_state);
        self.last_prayer = prayer;

        let line = self.describe(frame);
        if frame.demo {
            log_decorated!("[demo] {}", line);
        } else {
            log_decorated!("{}", line);
        }
        if self.debug_enabled {
            log_indented!("{}", frame.screen_state.arabic_label());
        }
    }

    fn reconfigure(&mut self, config: &crate::config::Config) {
        self.tz = config.tz();
        self.last_date = None;
    }

    fn shutdown(&mut self) {
        self.last_state = None;
        self.last_prayer = None;
    }
}
