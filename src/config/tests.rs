use super::builder::default_config_content;
use super::validation::{find_window_overlaps, validate_config};
use super::*;
use crate::common::constants::test_constants::*;
use crate::common::constants::{
    MAXIMUM_CONGREGATION_OFFSET, MAXIMUM_FETCH_DAYS, MAXIMUM_PRAYER_DURATION,
    MAXIMUM_REMEMBRANCE_DURATION,
};
use crate::prayer::DailySchedule;
use chrono::{NaiveDate, NaiveTime};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn create_test_config(
    dhuhr_offset: Option<u32>,
    prayer_duration: Option<f64>,
    remembrance_duration: Option<f64>,
) -> Config {
    Config {
        city: Some(TEST_CITY.to_string()),
        country: Some(TEST_COUNTRY.to_string()),
        timezone: Some(TEST_TIMEZONE.to_string()),
        latitude: Some(TEST_LATITUDE),
        longitude: Some(TEST_LONGITUDE),
        congregation_offsets: Some(CongregationOffsets {
            dhuhr: dhuhr_offset,
            ..CongregationOffsets::default()
        }),
        prayer_duration,
        remembrance_duration,
        ..Config::default()
    }
}

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("minbar.toml");
    fs::write(&path, content).unwrap();
    (temp_dir, path)
}

#[test]
#[serial]
fn test_config_load_default_creation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("minbar").join("minbar.toml");

    // Save and restore XDG_CONFIG_HOME
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = Config::load();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    if let Err(e) = &result {
        eprintln!("Config::load() failed: {:?}", e);
    }
    assert!(result.is_ok());
    assert!(config_path.exists());
    assert_eq!(result.unwrap().city(), "Riyadh");
}

#[test]
fn test_default_config_content_parses_and_validates() {
    let content = default_config_content();
    let config: Config = toml::from_str(&content).unwrap();

    assert!(validate_config(&config).is_ok());
    assert_eq!(config.timezone_name(), "Asia/Riyadh");
    assert_eq!(config.offset_for(PrayerName::Fajr), 20);
    assert_eq!(config.offset_for(PrayerName::Maghrib), 5);
    assert_eq!(config.prayer_duration(), 15.0);
    assert!(config.latitude.is_none());
}

#[test]
fn test_load_from_path_with_offsets_table() {
    let (_dir, path) = write_config(
        r#"
name = "Masjid Al-Noor"
city = "Makkah"
timezone = "Asia/Riyadh"
prayer_duration = 8.5

[congregation_offsets]
dhuhr = 20
"#,
    );

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.name(), "Masjid Al-Noor");
    assert_eq!(config.offset_for(PrayerName::Dhuhr), 20);
    assert_eq!(config.offset_for(PrayerName::Asr), 15);
    assert_eq!(config.offset_for(PrayerName::Sunrise), 0);
    assert_eq!(config.prayer_duration(), 8.5);
    assert_eq!(config.remembrance_duration(), 5.0);
}

#[test]
fn test_load_from_path_missing_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("absent.toml");
    assert!(load_from_path(&path).is_err());
}

#[test]
fn test_load_from_path_rejects_malformed_toml() {
    let (_dir, path) = write_config("prayer_duration = [not toml");
    assert!(load_from_path(&path).is_err());
}

#[test]
fn test_load_from_path_rejects_unknown_timezone() {
    let (_dir, path) = write_config(r#"timezone = "Mars/Olympus_Mons""#);
    let err = load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("IANA"));
}

#[test]
fn test_config_validation_basic() {
    let config = create_test_config(
        Some(TEST_DHUHR_OFFSET),
        Some(TEST_PRAYER_DURATION),
        Some(TEST_REMEMBRANCE_DURATION),
    );
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_offset_range() {
    let config = create_test_config(Some(MAXIMUM_CONGREGATION_OFFSET + 1), None, None);
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_config_validation_duration_ranges() {
    let too_long = create_test_config(None, Some(MAXIMUM_PRAYER_DURATION + 1.0), None);
    assert!(validate_config(&too_long).is_err());

    let too_short = create_test_config(None, Some(0.5), None);
    assert!(validate_config(&too_short).is_err());

    let remembrance = create_test_config(None, None, Some(MAXIMUM_REMEMBRANCE_DURATION + 1.0));
    assert!(validate_config(&remembrance).is_err());
}

#[test]
fn test_config_validation_activity_window_bound() {
    // 5 + 30 + 1 + 30 + 10 = 76 minutes
    let config = create_test_config(Some(30), Some(30.0), Some(10.0));
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("activity window"));

    // 5 + 30 + 1 + 30 + 9 = 75 minutes is allowed
    let config = create_test_config(Some(30), Some(30.0), Some(9.0));
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_coordinates() {
    let mut config = create_test_config(None, None, None);
    config.latitude = Some(91.0);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.longitude = Some(-180.5);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.longitude = None;
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_config_validation_misc_fields() {
    let mut config = create_test_config(None, None, None);
    config.school = Some(2);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.fetch_days = Some(MAXIMUM_FETCH_DAYS + 1);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.fetch_days = Some(0);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.api_base_url = Some("ftp://example.com".to_string());
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.fajr_angle = Some(30.0);
    assert!(validate_config(&config).is_err());

    let mut config = create_test_config(None, None, None);
    config.city = Some("  ".to_string());
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_api_base_url_trailing_slash_trimmed() {
    let config = Config {
        api_base_url: Some("http://localhost:8080/v1/".to_string()),
        ..Config::default()
    };
    assert_eq!(config.api_base_url(), "http://localhost:8080/v1");
}

fn schedule_with(times: [(u32, u32); 6], config: &Config) -> DailySchedule {
    let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
    let times = times.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
    DailySchedule::from_wall_clock(date, times, config.tz(), config).unwrap()
}

#[test]
fn test_find_window_overlaps_none_for_typical_day() {
    let config = Config::default();
    let schedule = schedule_with(
        [(5, 31), (6, 50), (12, 17), (15, 23), (17, 41), (19, 11)],
        &config,
    );
    assert!(find_window_overlaps(&schedule, &config).is_empty());
}

#[test]
fn test_find_window_overlaps_detects_short_gap() {
    let config = Config::default();
    // Maghrib window ends 17:41 + 5 + 1 + 15 + 5 = 18:07, Isha countdown starts 18:00
    let schedule = schedule_with(
        [(5, 31), (6, 50), (12, 17), (15, 23), (17, 41), (18, 5)],
        &config,
    );
    assert_eq!(
        find_window_overlaps(&schedule, &config),
        vec![(PrayerName::Maghrib, PrayerName::Isha)]
    );
}
