//! Configuration validation functionality.
//!
//! Rejects out-of-range values and configurations whose prayer activity
//! windows are long enough to run into each other.

use anyhow::Result;
use chrono::Duration;
use chrono_tz::Tz;

use super::Config;
use crate::common::constants::*;
use crate::prayer::{DailySchedule, PrayerName};

/// Comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(ref name) = config.timezone
        && name.parse::<Tz>().is_err()
    {
        anyhow::bail!("timezone '{}' is not a known IANA timezone", name);
    }

    if let Some(ref city) = config.city
        && city.trim().is_empty()
    {
        anyhow::bail!("city must not be empty");
    }

    if let Some(ref country) = config.country
        && country.trim().is_empty()
    {
        anyhow::bail!("country must not be empty");
    }

    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if config.latitude.is_some() != config.longitude.is_some() {
        anyhow::bail!("latitude and longitude must be set together");
    }

    if let Some(method) = config.calculation_method
        && method > MAXIMUM_CALCULATION_METHOD
    {
        anyhow::bail!(
            "calculation_method ({}) must be between 0 and {}",
            method,
            MAXIMUM_CALCULATION_METHOD
        );
    }

    if let Some(school) = config.school
        && school > 1
    {
        anyhow::bail!("school ({}) must be 0 (Shafi'i) or 1 (Hanafi)", school);
    }

    for prayer in PrayerName::CONGREGATIONAL {
        let offset = config.offset_for(prayer);
        if offset > MAXIMUM_CONGREGATION_OFFSET {
            anyhow::bail!(
                "congregation_offsets.{} ({} minutes) must be between 0 and {} minutes",
                prayer.as_str(),
                offset,
                MAXIMUM_CONGREGATION_OFFSET
            );
        }
    }

    if let Some(duration) = config.prayer_duration
        && !(MINIMUM_PRAYER_DURATION..=MAXIMUM_PRAYER_DURATION).contains(&duration)
    {
        anyhow::bail!(
            "prayer_duration ({} minutes) must be between {} and {} minutes",
            duration,
            MINIMUM_PRAYER_DURATION,
            MAXIMUM_PRAYER_DURATION
        );
    }

    if let Some(duration) = config.remembrance_duration
        && !(MINIMUM_REMEMBRANCE_DURATION..=MAXIMUM_REMEMBRANCE_DURATION).contains(&duration)
    {
        anyhow::bail!(
            "remembrance_duration ({} minutes) must be between {} and {} minutes",
            duration,
            MINIMUM_REMEMBRANCE_DURATION,
            MAXIMUM_REMEMBRANCE_DURATION
        );
    }

    if let Some(adjustment) = config.calendar_adjustment
        && adjustment.abs() > MAXIMUM_CALENDAR_ADJUSTMENT
    {
        anyhow::bail!(
            "calendar_adjustment ({} minutes) must be between -{} and {} minutes",
            adjustment,
            MAXIMUM_CALENDAR_ADJUSTMENT,
            MAXIMUM_CALENDAR_ADJUSTMENT
        );
    }

    for (field, angle) in [("fajr_angle", config.fajr_angle), ("isha_angle", config.isha_angle)] {
        if let Some(angle) = angle
            && !(MINIMUM_TWILIGHT_ANGLE..=MAXIMUM_TWILIGHT_ANGLE).contains(&angle)
        {
            anyhow::bail!(
                "{} ({}°) must be between {}° and {}°",
                field,
                angle,
                MINIMUM_TWILIGHT_ANGLE,
                MAXIMUM_TWILIGHT_ANGLE
            );
        }
    }

    if let Some(days) = config.fetch_days
        && !(MINIMUM_FETCH_DAYS..=MAXIMUM_FETCH_DAYS).contains(&days)
    {
        anyhow::bail!(
            "fetch_days ({}) must be between {} and {}",
            days,
            MINIMUM_FETCH_DAYS,
            MAXIMUM_FETCH_DAYS
        );
    }

    if let Some(ref url) = config.api_base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        anyhow::bail!("api_base_url ('{}') must start with http:// or https://", url);
    }

    if let Some(interval) = config.demo_interval
        && interval > MAXIMUM_DEMO_INTERVAL
    {
        anyhow::bail!(
            "demo_interval ({} seconds) must be between 0 and {} seconds",
            interval,
            MAXIMUM_DEMO_INTERVAL
        );
    }

    // Activity windows must stay short enough not to reach the next prayer
    for prayer in PrayerName::CONGREGATIONAL {
        let window = config.activity_window_minutes(prayer);
        if window > MAXIMUM_ACTIVITY_WINDOW_MINUTES {
            anyhow::bail!(
                "{} activity window is {} minutes (5 + offset {} + 1 + prayer {} + remembrance {}), \
                 the maximum is {} minutes",
                prayer.as_str(),
                window,
                config.offset_for(prayer),
                config.prayer_duration(),
                config.remembrance_duration(),
                MAXIMUM_ACTIVITY_WINDOW_MINUTES
            );
        }
    }

    Ok(())
}

/// Pairs of consecutive congregational prayers whose activity windows
/// overlap on `schedule`.
///
/// The window of a prayer runs from the pre-call countdown to the end of
/// remembrance. An overlap does not break the scheduler (the earlier prayer
/// wins) but the later prayer's countdown gets cut short.
pub fn find_window_overlaps(
    schedule: &DailySchedule,
    config: &Config,
) -> Vec<(PrayerName, PrayerName)> {
    let millis = |minutes: f64| Duration::milliseconds((minutes * 60_000.0).round() as i64);

    PrayerName::CONGREGATIONAL
        .windows(2)
        .filter_map(|pair| {
            let earlier = schedule.get(pair[0]);
            let later = schedule.get(pair[1]);
            let earlier_end = earlier.congregation_instant()
                + millis(
                    CONGREGATION_START_MINUTES
                        + config.prayer_duration()
                        + config.remembrance_duration(),
                );
            let later_start = later.instant - millis(PRE_CALL_MINUTES);
            (earlier_end > later_start).then_some((pair[0], pair[1]))
        })
        .collect()
}
