//! Configuration system for minbar with validation and hot reload.
//!
//! Settings live in a single `minbar.toml` file:
//! 1. **--config DIR**/minbar.toml when a custom directory is given
//! 2. **XDG_CONFIG_HOME**/minbar/minbar.toml otherwise
//!
//! A commented default file is written when none exists.
//!
//! ## Configuration Structure
//!
//! ```toml
//! #[Mosque]
//! name = "المسجد"                # Shown on the dashboard
//! city = "Riyadh"                # City sent to the prayer-time provider
//! country = "Saudi Arabia"       # Country sent to the prayer-time provider
//! timezone = "Asia/Riyadh"       # IANA timezone of the mosque
//! latitude = 24.7136             # Optional, used by the offline calculator
//! longitude = 46.6753            # Optional, used by the offline calculator
//!
//! #[Calculation]
//! calculation_method = 4         # AlAdhan method id (0-23, 4 = Umm al-Qura)
//! school = 0                     # 0 = Shafi'i, 1 = Hanafi (Asr shadow factor)
//! calendar_adjustment = 1        # Minutes added to provider adhan times (-30..30)
//! fajr_angle = 18.5              # Offline calculator twilight angle (10-25)
//! isha_angle = 17.0              # Offline calculator twilight angle (10-25)
//!
//! #[Screens]
//! prayer_duration = 15.0         # Minutes of the in-prayer screen (1-45)
//! remembrance_duration = 5.0     # Minutes of the remembrance screen (0-30)
//! demo_interval = 5              # Seconds between demo steps (0 = manual only)
//!
//! #[Provider]
//! fetch_days = 7                 # Days fetched per provider refresh (1-30)
//! api_base_url = "https://api.aladhan.com/v1"
//!
//! [congregation_offsets]         # Minutes between call and congregation (0-60)
//! fajr = 20
//! dhuhr = 15
//! asr = 15
//! maghrib = 5
//! isha = 15
//! ```
//!
//! ## Validation and Error Handling
//!
//! Every field is range checked at load time, the timezone must be a known IANA
//! name, and the activity window of each prayer (`5 + offset + 1 + prayer +
//! remembrance` minutes) is bounded so neighbouring windows cannot overlap on
//! realistic schedules.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

#[cfg(test)]
mod tests;

use anyhow::Result;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::common::constants::*;
use crate::prayer::PrayerName;

// Re-export public API
pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use watcher::start_config_watcher;

/// Minutes between each call and its congregation.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CongregationOffsets {
    pub fajr: Option<u32>,
    pub dhuhr: Option<u32>,
    pub asr: Option<u32>,
    pub maghrib: Option<u32>,
    pub isha: Option<u32>,
}

/// Configuration structure for minbar.
///
/// Loaded from `minbar.toml`. Every field is optional and falls back to the
/// defaults in `common::constants`; use the accessor methods rather than the
/// raw fields when a concrete value is needed.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>, // IANA name, e.g. "Asia/Riyadh"
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub calculation_method: Option<u8>,
    pub school: Option<u8>, // 0 = Shafi'i, 1 = Hanafi
    pub congregation_offsets: Option<CongregationOffsets>,
    pub prayer_duration: Option<f64>,      // minutes
    pub remembrance_duration: Option<f64>, // minutes
    pub calendar_adjustment: Option<i64>,  // minutes
    pub fajr_angle: Option<f64>,
    pub isha_angle: Option<f64>,
    pub fetch_days: Option<u32>,
    pub api_base_url: Option<String>,
    pub demo_interval: Option<u64>, // seconds
}

impl Config {
    /// Load configuration using the module's load function
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    pub fn city(&self) -> &str {
        self.city.as_deref().unwrap_or(DEFAULT_CITY)
    }

    pub fn country(&self) -> &str {
        self.country.as_deref().unwrap_or(DEFAULT_COUNTRY)
    }

    pub fn timezone_name(&self) -> &str {
        self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
    }

    /// Mosque timezone. An unparseable name (rejected by validation) falls
    /// back to the default zone.
    pub fn tz(&self) -> Tz {
        self.timezone_name()
            .parse()
            .unwrap_or(chrono_tz::Asia::Riyadh)
    }

    pub fn calculation_method(&self) -> u8 {
        self.calculation_method.unwrap_or(DEFAULT_CALCULATION_METHOD)
    }

    pub fn school(&self) -> u8 {
        self.school.unwrap_or(DEFAULT_SCHOOL)
    }

    /// Congregation offset for `prayer`; always 0 for sunrise.
    pub fn offset_for(&self, prayer: PrayerName) -> u32 {
        let offsets = self.congregation_offsets.as_ref();
        match prayer {
            PrayerName::Fajr => offsets.and_then(|o| o.fajr).unwrap_or(DEFAULT_FAJR_OFFSET),
            PrayerName::Sunrise => 0,
            PrayerName::Dhuhr => offsets.and_then(|o| o.dhuhr).unwrap_or(DEFAULT_DHUHR_OFFSET),
            PrayerName::Asr => offsets.and_then(|o| o.asr).unwrap_or(DEFAULT_ASR_OFFSET),
            PrayerName::Maghrib => offsets
                .and_then(|o| o.maghrib)
                .unwrap_or(DEFAULT_MAGHRIB_OFFSET),
            PrayerName::Isha => offsets.and_then(|o| o.isha).unwrap_or(DEFAULT_ISHA_OFFSET),
        }
    }

    pub fn prayer_duration(&self) -> f64 {
        self.prayer_duration.unwrap_or(DEFAULT_PRAYER_DURATION)
    }

    pub fn remembrance_duration(&self) -> f64 {
        self.remembrance_duration
            .unwrap_or(DEFAULT_REMEMBRANCE_DURATION)
    }

    pub fn calendar_adjustment(&self) -> i64 {
        self.calendar_adjustment
            .unwrap_or(DEFAULT_CALENDAR_ADJUSTMENT)
    }

    pub fn fajr_angle(&self) -> f64 {
        self.fajr_angle.unwrap_or(DEFAULT_FAJR_ANGLE)
    }

    pub fn isha_angle(&self) -> f64 {
        self.isha_angle.unwrap_or(DEFAULT_ISHA_ANGLE)
    }

    pub fn fetch_days(&self) -> u32 {
        self.fetch_days.unwrap_or(DEFAULT_FETCH_DAYS)
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn demo_interval(&self) -> u64 {
        self.demo_interval.unwrap_or(DEFAULT_DEMO_INTERVAL)
    }

    /// Length of the activity window of `prayer` in minutes, from the start
    /// of the pre-call countdown to the end of remembrance.
    pub fn activity_window_minutes(&self, prayer: PrayerName) -> f64 {
        PRE_CALL_MINUTES
            + f64::from(self.offset_for(prayer))
            + CONGREGATION_START_MINUTES
            + self.prayer_duration()
            + self.remembrance_duration()
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Mosque: {}", self.name());
        log_indented!(
            "Location: {}, {} ({})",
            self.city(),
            self.country(),
            self.timezone_name()
        );
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            let lat_dir = if lat >= 0.0 { "N" } else { "S" };
            let lon_dir = if lon >= 0.0 { "E" } else { "W" };
            log_indented!(
                "Coordinates: {:.3}°{}, {:.3}°{}",
                lat.abs(),
                lat_dir,
                lon.abs(),
                lon_dir
            );
        }
        log_indented!(
            "Method: {} | School: {}",
            self.calculation_method(),
            if self.school() == 1 { "Hanafi" } else { "Shafi'i" }
        );
        log_indented!(
            "Congregation offsets: fajr {}m, dhuhr {}m, asr {}m, maghrib {}m, isha {}m",
            self.offset_for(PrayerName::Fajr),
            self.offset_for(PrayerName::Dhuhr),
            self.offset_for(PrayerName::Asr),
            self.offset_for(PrayerName::Maghrib),
            self.offset_for(PrayerName::Isha)
        );
        log_indented!(
            "Prayer: {}m | Remembrance: {}m",
            self.prayer_duration(),
            self.remembrance_duration()
        );
    }
}
