//! Offline prayer-time calculation.
//!
//! Used whenever the remote provider cannot deliver today's schedule. The
//! results are approximate but always form a valid [`DailySchedule`], even at
//! latitudes where twilight never ends.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Offset, Utc};
use chrono_tz::Tz;

use super::cities::{CoordinateSource, Coordinates, resolve_coordinates};
use super::{DailySchedule, PrayerName, PrayerTime, resolve_local};
use crate::config::Config;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Minutes after solar noon at which Dhuhr is announced
const DHUHR_DELAY_MINUTES: f64 = 2.0;

/// Produces an approximate schedule without network access.
pub trait FallbackCalculator: Send + Sync {
    /// Pure and deterministic; never fails.
    fn compute(&self, date: NaiveDate, config: &Config) -> DailySchedule;

    /// Short description for log output.
    fn describe(&self) -> String;
}

/// Choose the calculator for `config`: solar approximation when a position is
/// known, the representative table otherwise.
pub fn fallback_for(config: &Config) -> Box<dyn FallbackCalculator> {
    match resolve_coordinates(config) {
        Some((coordinates, source)) => Box::new(SolarApproximation {
            coordinates,
            source,
        }),
        None => Box::new(RepresentativeTable),
    }
}

/// Simplified solar-position calculation.
#[derive(Debug, Clone)]
pub struct SolarApproximation {
    pub coordinates: Coordinates,
    pub source: CoordinateSource,
}

impl SolarApproximation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: Coordinates {
                latitude,
                longitude,
            },
            source: CoordinateSource::Configured,
        }
    }

    /// Raw prayer minutes after local midnight, in schedule order.
    fn raw_minutes(&self, date: NaiveDate, config: &Config) -> [f64; 6] {
        let Coordinates {
            latitude,
            longitude,
        } = self.coordinates;
        let tz = config.tz();

        let day_of_year = f64::from(date.ordinal());
        let declination = -23.45 * cos_deg(360.0 / 365.0 * (day_of_year + 10.0));

        let b = 360.0 / 365.0 * (day_of_year - 81.0);
        let equation_of_time = 9.87 * sin_deg(2.0 * b) - 7.53 * cos_deg(b) - 1.5 * sin_deg(b);

        let solar_noon =
            720.0 - 4.0 * longitude - equation_of_time + utc_offset_minutes(date, tz);

        let twilight_angle = |altitude: f64| hour_angle(altitude, latitude, declination);

        let shadow_factor = if config.school() == 1 { 2.0 } else { 1.0 };
        let asr_altitude =
            atan_deg(1.0 / (shadow_factor + tan_deg((latitude - declination).abs())));

        let fajr = solar_noon - 4.0 * twilight_angle(-config.fajr_angle());
        let sunrise = solar_noon - 4.0 * twilight_angle(0.0);
        let dhuhr = solar_noon + DHUHR_DELAY_MINUTES;
        let asr = solar_noon + 4.0 * twilight_angle(asr_altitude);
        let maghrib = solar_noon + 4.0 * twilight_angle(0.0);
        let isha = solar_noon + 4.0 * twilight_angle(-config.isha_angle());

        [fajr, sunrise, dhuhr, asr, maghrib, isha]
    }
}

impl FallbackCalculator for SolarApproximation {
    fn compute(&self, date: NaiveDate, config: &Config) -> DailySchedule {
        assemble(date, self.raw_minutes(date, config), config)
    }

    fn describe(&self) -> String {
        let Coordinates {
            latitude,
            longitude,
        } = self.coordinates;
        match &self.source {
            CoordinateSource::Configured => {
                format!("solar approximation at {latitude:.4}, {longitude:.4}")
            }
            CoordinateSource::CityDatabase { city, country } => format!(
                "solar approximation at {latitude:.4}, {longitude:.4} ({city}, {country})"
            ),
        }
    }
}

/// Representative Makkah prayer times per month, used when no position is
/// available at all.
#[derive(Debug, Clone, Copy)]
pub struct RepresentativeTable;

// fajr, sunrise, dhuhr, asr, maghrib, isha as (hour, minute)
const MAKKAH_MONTHLY: [[(u32, u32); 6]; 12] = [
    [(5, 38), (6, 58), (12, 28), (15, 36), (17, 55), (19, 25)],
    [(5, 38), (6, 56), (12, 33), (15, 50), (18, 11), (19, 41)],
    [(5, 25), (6, 43), (12, 31), (15, 53), (18, 20), (19, 50)],
    [(5, 5), (6, 23), (12, 25), (15, 50), (18, 27), (19, 57)],
    [(4, 47), (6, 8), (12, 21), (15, 41), (18, 35), (20, 5)],
    [(4, 38), (6, 2), (12, 22), (15, 39), (18, 43), (20, 13)],
    [(4, 43), (6, 7), (12, 27), (15, 45), (18, 48), (20, 18)],
    [(4, 55), (6, 16), (12, 28), (15, 50), (18, 40), (20, 10)],
    [(5, 5), (6, 22), (12, 21), (15, 48), (18, 22), (19, 52)],
    [(5, 10), (6, 26), (12, 11), (15, 35), (17, 58), (19, 28)],
    [(5, 18), (6, 35), (12, 9), (15, 22), (17, 40), (19, 10)],
    [(5, 31), (6, 50), (12, 17), (15, 23), (17, 41), (19, 11)],
];

impl FallbackCalculator for RepresentativeTable {
    fn compute(&self, date: NaiveDate, config: &Config) -> DailySchedule {
        let row = MAKKAH_MONTHLY[date.month0() as usize];
        let minutes = row.map(|(h, m)| f64::from(h * 60 + m));
        assemble(date, minutes, config)
    }

    fn describe(&self) -> String {
        "representative Makkah table".to_string()
    }
}

/// Turn raw minutes after local midnight into a valid schedule.
///
/// Non-finite values are replaced, every instant is clamped into the local
/// day, and instants are forced strictly increasing.
fn assemble(date: NaiveDate, minutes: [f64; 6], config: &Config) -> DailySchedule {
    let tz = config.tz();
    let (day_start, day_end) = local_day_bounds(date, tz);
    let midnight = date.and_time(NaiveTime::MIN);

    let mut instants = minutes.map(|raw| {
        let minute = if raw.is_finite() {
            raw.round().clamp(0.0, 1439.0) as i64
        } else {
            720
        };
        resolve_local(tz, midnight + Duration::minutes(minute)).clamp(day_start, day_end)
    });

    let step = Duration::minutes(1);
    for i in 1..instants.len() {
        if instants[i] <= instants[i - 1] {
            instants[i] = instants[i - 1] + step;
        }
    }
    if instants[5] > day_end {
        instants[5] = day_end;
    }
    for i in (0..instants.len() - 1).rev() {
        if instants[i] >= instants[i + 1] {
            instants[i] = instants[i + 1] - step;
        }
    }

    let prayers = PrayerName::ALL
        .map(|name| PrayerTime::new(name, instants[name.index()], config.offset_for(name)));

    // Instants are increasing and inside the local day, so validation holds
    match DailySchedule::new(date, prayers.clone(), tz) {
        Ok(schedule) => schedule,
        Err(e) => {
            log_critical!("Offline schedule for {} failed validation: {}", date, e);
            DailySchedule { date, prayers }
        }
    }
}

/// First and last whole minute of `date` in `tz` as absolute instants.
fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = resolve_local(tz, date.and_time(NaiveTime::MIN));
    let end = match date.succ_opt() {
        Some(next) => resolve_local(tz, next.and_time(NaiveTime::MIN)) - Duration::minutes(1),
        None => start + Duration::minutes(1439),
    };
    (start, end)
}

/// UTC offset of `tz` at local noon of `date`, in minutes.
fn utc_offset_minutes(date: NaiveDate, tz: Tz) -> f64 {
    let noon = resolve_local(tz, date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)));
    let offset = noon.with_timezone(&tz).offset().fix().local_minus_utc();
    f64::from(offset) / 60.0
}

/// Hour angle in degrees at which the sun reaches `altitude`.
///
/// Returns a clamped angle where the sun never reaches that altitude.
fn hour_angle(altitude: f64, latitude: f64, declination: f64) -> f64 {
    let numerator = sin_deg(altitude) - sin_deg(latitude) * sin_deg(declination);
    let denominator = cos_deg(latitude) * cos_deg(declination);
    acos_deg(clamp_unit(numerator / denominator))
}

/// Clamp an `acos` argument into [-1, 1]; NaN becomes 0.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

fn sin_deg(x: f64) -> f64 {
    (x * DEG_TO_RAD).sin()
}

fn cos_deg(x: f64) -> f64 {
    (x * DEG_TO_RAD).cos()
}

fn tan_deg(x: f64) -> f64 {
    (x * DEG_TO_RAD).tan()
}

fn acos_deg(x: f64) -> f64 {
    x.acos() * RAD_TO_DEG
}

fn atan_deg(x: f64) -> f64 {
    x.atan() * RAD_TO_DEG
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn riyadh() -> Config {
        Config {
            latitude: Some(24.7136),
            longitude: Some(46.6753),
            ..Config::default()
        }
    }

    fn local_hm(schedule: &DailySchedule, name: PrayerName, tz: Tz) -> (u32, u32) {
        let local = schedule.get(name).instant.with_timezone(&tz);
        (local.hour(), local.minute())
    }

    fn minutes_between(a: (u32, u32), b: (u32, u32)) -> i64 {
        (i64::from(b.0) * 60 + i64::from(b.1)) - (i64::from(a.0) * 60 + i64::from(a.1))
    }

    #[test]
    fn test_riyadh_summer_times_are_plausible() {
        let config = riyadh();
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let schedule = SolarApproximation::new(24.7136, 46.6753).compute(date, &config);
        let tz = config.tz();

        // Published Umm al-Qura times for Riyadh are about 03:35 / 05:05 / 11:52 / 15:16 / 18:40
        let checks = [
            (PrayerName::Sunrise, (5, 5)),
            (PrayerName::Dhuhr, (11, 54)),
            (PrayerName::Maghrib, (18, 40)),
        ];
        for (name, expected) in checks {
            let actual = local_hm(&schedule, name, tz);
            assert!(
                minutes_between(expected, actual).abs() <= 10,
                "{name}: expected about {expected:?}, got {actual:?}"
            );
        }
    }

    #[test]
    fn test_hanafi_asr_is_later() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let shafii = riyadh();
        let hanafi = Config {
            school: Some(1),
            ..riyadh()
        };
        let calc = SolarApproximation::new(24.7136, 46.6753);
        let early = calc.compute(date, &shafii).get(PrayerName::Asr).instant;
        let late = calc.compute(date, &hanafi).get(PrayerName::Asr).instant;
        assert!(late > early + Duration::minutes(30));
    }

    #[test]
    fn test_polar_summer_still_produces_valid_schedule() {
        let config = Config {
            timezone: Some("Europe/Oslo".to_string()),
            ..Config::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let schedule = SolarApproximation::new(78.22, 15.65).compute(date, &config);

        let tz = config.tz();
        assert!(DailySchedule::new(date, schedule.prayers().clone(), tz).is_ok());
    }

    #[test]
    fn test_representative_table_uses_month_row() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let schedule = RepresentativeTable.compute(date, &config);
        let tz = config.tz();

        assert_eq!(local_hm(&schedule, PrayerName::Fajr, tz), (4, 43));
        assert_eq!(local_hm(&schedule, PrayerName::Isha, tz), (20, 18));
        assert_eq!(schedule.get(PrayerName::Isha).congregation_offset_minutes, 15);
    }

    #[test]
    fn test_assemble_forces_strictly_increasing_minutes() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let schedule = assemble(
            date,
            [f64::NAN, 1500.0, 1439.0, -30.0, 700.0, 700.0],
            &config,
        );
        let instants: Vec<_> = schedule.iter().map(|p| p.instant).collect();
        assert!(instants.windows(2).all(|w| w[0] < w[1]));
        assert!(DailySchedule::new(date, schedule.prayers().clone(), config.tz()).is_ok());
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(3.5), 1.0);
        assert_eq!(clamp_unit(-7.0), -1.0);
        assert_eq!(clamp_unit(0.25), 0.25);
    }

    #[test]
    fn test_fallback_for_without_position_uses_table() {
        let config = Config {
            city: Some("Definitely Not A City 123".to_string()),
            ..Config::default()
        };
        assert_eq!(fallback_for(&config).describe(), "representative Makkah table");
    }
}
