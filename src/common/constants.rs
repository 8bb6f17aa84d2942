//! Application-wide constants and configuration defaults.
//!
//! Defaults are used whenever a field is missing from `minbar.toml`. Limits
//! are enforced by `config::validation`.

// # Location Defaults

pub const DEFAULT_NAME: &str = "المسجد";
pub const DEFAULT_CITY: &str = "Riyadh";
pub const DEFAULT_COUNTRY: &str = "Saudi Arabia";
pub const DEFAULT_TIMEZONE: &str = "Asia/Riyadh";

// # Calculation Defaults

/// AlAdhan method 4 (Umm al-Qura, Makkah)
pub const DEFAULT_CALCULATION_METHOD: u8 = 4;
/// 0 = Shafi'i (shadow factor 1), 1 = Hanafi (shadow factor 2)
pub const DEFAULT_SCHOOL: u8 = 0;
/// Minutes added to each adhan time returned by the provider (sunrise excluded)
pub const DEFAULT_CALENDAR_ADJUSTMENT: i64 = 1;
pub const DEFAULT_FAJR_ANGLE: f64 = 18.5;
pub const DEFAULT_ISHA_ANGLE: f64 = 17.0;

// # Congregation Defaults (minutes after the call)

pub const DEFAULT_FAJR_OFFSET: u32 = 20;
pub const DEFAULT_DHUHR_OFFSET: u32 = 15;
pub const DEFAULT_ASR_OFFSET: u32 = 15;
pub const DEFAULT_MAGHRIB_OFFSET: u32 = 5;
pub const DEFAULT_ISHA_OFFSET: u32 = 15;

// # Screen Durations (minutes)

pub const DEFAULT_PRAYER_DURATION: f64 = 15.0;
pub const DEFAULT_REMEMBRANCE_DURATION: f64 = 5.0;

/// Pre-call countdown shown before each call
pub const PRE_CALL_MINUTES: f64 = 5.0;
/// Call announcement screen length
pub const CALL_MINUTES: f64 = 3.0;
/// End of the post-call supplication screen, measured from the call
pub const POST_CALL_END_MINUTES: f64 = 3.5;
/// Congregation-start announcement length
pub const CONGREGATION_START_MINUTES: f64 = 1.0;

// # Remote Provider

pub const DEFAULT_API_BASE_URL: &str = "https://api.aladhan.com/v1";
pub const DEFAULT_FETCH_DAYS: u32 = 7;
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const HTTP_MAX_RETRIES: u32 = 2;
pub const HTTP_RETRY_BACKOFF_MS: u64 = 750;

// # Refresh & Demo

/// Local wall-clock time of the daily schedule refresh
pub const REFRESH_HOUR: u32 = 0;
pub const REFRESH_MINUTE: u32 = 5;
/// Seconds between automatic demo steps (0 = manual only)
pub const DEFAULT_DEMO_INTERVAL: u64 = 5;

// # Validation Limits

pub const MAXIMUM_CONGREGATION_OFFSET: u32 = 60;
pub const MINIMUM_PRAYER_DURATION: f64 = 1.0;
pub const MAXIMUM_PRAYER_DURATION: f64 = 45.0;
pub const MINIMUM_REMEMBRANCE_DURATION: f64 = 0.0;
pub const MAXIMUM_REMEMBRANCE_DURATION: f64 = 30.0;
/// Upper bound on `5 + offset + 1 + prayer + remembrance`
pub const MAXIMUM_ACTIVITY_WINDOW_MINUTES: f64 = 75.0;
pub const MAXIMUM_CALENDAR_ADJUSTMENT: i64 = 30;
pub const MINIMUM_TWILIGHT_ANGLE: f64 = 10.0;
pub const MAXIMUM_TWILIGHT_ANGLE: f64 = 25.0;
pub const MINIMUM_FETCH_DAYS: u32 = 1;
pub const MAXIMUM_FETCH_DAYS: u32 = 30;
pub const MAXIMUM_DEMO_INTERVAL: u64 = 3600;
/// AlAdhan methods 0..=23 (99 = custom is not supported)
pub const MAXIMUM_CALCULATION_METHOD: u8 = 23;
