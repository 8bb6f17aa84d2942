//! Prayer-time data model.
//!
//! A [`DailySchedule`] holds the six daily times of one calendar date in the
//! mosque timezone. Construction validates the invariants every consumer
//! relies on (canonical order, strictly increasing instants, single local
//! date), so the scheduler never has to re-check them.

pub mod calculator;
pub mod cities;
pub mod hijri;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::Config;

/// The six daily times, in schedule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Schedule order.
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// The five prayers that have a call and a congregation.
    pub const CONGREGATIONAL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Sunrise => "sunrise",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    pub fn arabic_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "الفجر",
            PrayerName::Sunrise => "الشروق",
            PrayerName::Dhuhr => "الظهر",
            PrayerName::Asr => "العصر",
            PrayerName::Maghrib => "المغرب",
            PrayerName::Isha => "العشاء",
        }
    }

    pub fn is_congregational(&self) -> bool {
        !matches!(self, PrayerName::Sunrise)
    }

    fn index(&self) -> usize {
        match self {
            PrayerName::Fajr => 0,
            PrayerName::Sunrise => 1,
            PrayerName::Dhuhr => 2,
            PrayerName::Asr => 3,
            PrayerName::Maghrib => 4,
            PrayerName::Isha => 5,
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One prayer of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerTime {
    pub name: PrayerName,
    pub display_name: String,
    pub instant: DateTime<Utc>,
    pub congregation_offset_minutes: u32,
}

impl PrayerTime {
    /// Build a prayer time; sunrise always gets a zero offset.
    pub fn new(name: PrayerName, instant: DateTime<Utc>, congregation_offset_minutes: u32) -> Self {
        Self {
            name,
            display_name: name.display_name().to_string(),
            instant,
            congregation_offset_minutes: if name.is_congregational() {
                congregation_offset_minutes
            } else {
                0
            },
        }
    }

    /// Instant the congregation (iqama) starts.
    pub fn congregation_instant(&self) -> DateTime<Utc> {
        self.instant + Duration::minutes(i64::from(self.congregation_offset_minutes))
    }
}

/// Violations of the [`DailySchedule`] invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("position {position} holds {found}, expected {expected}")]
    WrongOrder {
        position: usize,
        expected: PrayerName,
        found: PrayerName,
    },

    #[error("{later} ({later_at}) is not after {earlier} ({earlier_at})")]
    NotIncreasing {
        earlier: PrayerName,
        earlier_at: DateTime<Utc>,
        later: PrayerName,
        later_at: DateTime<Utc>,
    },

    #[error("{prayer} falls on {actual} in {tz}, expected {expected}")]
    WrongDate {
        prayer: PrayerName,
        expected: NaiveDate,
        actual: NaiveDate,
        tz: Tz,
    },

    #[error("{prayer} at {time} cannot be placed on {date}")]
    Unrepresentable {
        prayer: PrayerName,
        date: NaiveDate,
        time: NaiveTime,
    },
}

/// The validated prayer times of one date.
///
/// Other crates can only build one through [`DailySchedule::new`] or
/// [`DailySchedule::from_wall_clock`], so every value upholds the ordering
/// and date checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    date: NaiveDate,
    prayers: [PrayerTime; 6],
}

impl DailySchedule {
    /// Validate and build a schedule for `date` in the mosque timezone.
    pub fn new(date: NaiveDate, prayers: [PrayerTime; 6], tz: Tz) -> Result<Self, ScheduleError> {
        for (position, (prayer, expected)) in prayers.iter().zip(PrayerName::ALL).enumerate() {
            if prayer.name != expected {
                return Err(ScheduleError::WrongOrder {
                    position,
                    expected,
                    found: prayer.name,
                });
            }

            let actual = prayer.instant.with_timezone(&tz).date_naive();
            if actual != date {
                return Err(ScheduleError::WrongDate {
                    prayer: prayer.name,
                    expected: date,
                    actual,
                    tz,
                });
            }
        }

        for pair in prayers.windows(2) {
            if pair[1].instant <= pair[0].instant {
                return Err(ScheduleError::NotIncreasing {
                    earlier: pair[0].name,
                    earlier_at: pair[0].instant,
                    later: pair[1].name,
                    later_at: pair[1].instant,
                });
            }
        }

        Ok(Self { date, prayers })
    }

    /// Build a schedule from wall-clock times in the mosque timezone, taking
    /// congregation offsets from `config`.
    pub fn from_wall_clock(
        date: NaiveDate,
        times: [NaiveTime; 6],
        tz: Tz,
        config: &Config,
    ) -> Result<Self, ScheduleError> {
        let prayers = PrayerName::ALL.map(|name| {
            let naive = date.and_time(times[name.index()]);
            PrayerTime::new(name, resolve_local(tz, naive), config.offset_for(name))
        });
        Self::new(date, prayers, tz)
    }

    /// Copy of this schedule with congregation offsets taken from `config`.
    pub fn with_congregation_offsets(&self, config: &Config) -> Self {
        let prayers = self
            .prayers
            .clone()
            .map(|p| PrayerTime::new(p.name, p.instant, config.offset_for(p.name)));
        Self {
            date: self.date,
            prayers,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn prayers(&self) -> &[PrayerTime; 6] {
        &self.prayers
    }

    pub fn get(&self, name: PrayerName) -> &PrayerTime {
        &self.prayers[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrayerTime> {
        self.prayers.iter()
    }

    /// Earliest prayer (sunrise included) whose instant is after `now`.
    pub fn next_upcoming(&self, now: DateTime<Utc>) -> Option<&PrayerTime> {
        self.prayers.iter().find(|p| p.instant > now)
    }
}

/// Resolve a wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times take the earlier instant; times inside a DST gap are
/// moved forward by one hour.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Riyadh;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 8).unwrap()
    }

    fn times() -> [NaiveTime; 6] {
        [hm(4, 43), hm(6, 7), hm(12, 27), hm(15, 45), hm(18, 48), hm(20, 18)]
    }

    #[test]
    fn test_from_wall_clock_builds_valid_schedule() {
        let config = Config::default();
        let schedule = DailySchedule::from_wall_clock(date(), times(), Riyadh, &config).unwrap();

        assert_eq!(schedule.date(), date());
        let dhuhr = schedule.get(PrayerName::Dhuhr);
        assert_eq!(dhuhr.instant.to_rfc3339(), "2024-07-08T09:27:00+00:00");
        assert_eq!(dhuhr.congregation_offset_minutes, 15);
        assert_eq!(schedule.get(PrayerName::Sunrise).congregation_offset_minutes, 0);
        assert_eq!(dhuhr.display_name, "Dhuhr");
    }

    #[test]
    fn test_rejects_non_increasing_times() {
        let mut bad = times();
        bad[3] = hm(12, 27);
        let err = DailySchedule::from_wall_clock(date(), bad, Riyadh, &Config::default());
        assert!(matches!(err, Err(ScheduleError::NotIncreasing { later: PrayerName::Asr, .. })));
    }

    #[test]
    fn test_rejects_wrong_order() {
        let config = Config::default();
        let good = DailySchedule::from_wall_clock(date(), times(), Riyadh, &config).unwrap();
        let mut prayers = good.prayers().clone();
        prayers.swap(0, 1);
        let err = DailySchedule::new(date(), prayers, Riyadh).unwrap_err();
        assert!(matches!(err, ScheduleError::WrongOrder { position: 0, .. }));
    }

    #[test]
    fn test_rejects_instants_on_another_local_date() {
        let config = Config::default();
        let good = DailySchedule::from_wall_clock(date(), times(), Riyadh, &config).unwrap();
        let mut prayers = good.prayers().clone();
        prayers[5].instant = prayers[5].instant + Duration::hours(5);
        let err = DailySchedule::new(date(), prayers, Riyadh).unwrap_err();
        assert!(matches!(err, ScheduleError::WrongDate { prayer: PrayerName::Isha, .. }));
    }

    #[test]
    fn test_sunrise_offset_forced_to_zero() {
        let instant = Utc::now();
        assert_eq!(PrayerTime::new(PrayerName::Sunrise, instant, 30).congregation_offset_minutes, 0);
        assert_eq!(PrayerTime::new(PrayerName::Fajr, instant, 30).congregation_offset_minutes, 30);
    }

    #[test]
    fn test_next_upcoming_includes_sunrise() {
        let config = Config::default();
        let schedule = DailySchedule::from_wall_clock(date(), times(), Riyadh, &config).unwrap();
        let after_fajr = schedule.get(PrayerName::Fajr).instant + Duration::minutes(1);
        assert_eq!(schedule.next_upcoming(after_fajr).unwrap().name, PrayerName::Sunrise);

        let after_isha = schedule.get(PrayerName::Isha).instant;
        assert!(schedule.next_upcoming(after_isha).is_none());
    }

    #[test]
    fn test_resolve_local_skips_dst_gap() {
        let tz: Tz = "Europe/London".parse().unwrap();
        let gap = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().and_hms_opt(1, 30, 0).unwrap();
        let resolved = resolve_local(tz, gap);
        assert_eq!(resolved.to_rfc3339(), "2024-03-31T01:30:00+00:00");
    }

    #[test]
    fn test_serializes_camel_case() {
        let prayer = PrayerTime::new(PrayerName::Maghrib, Utc::now(), 5);
        let json = serde_json::to_value(&prayer).unwrap();
        assert_eq!(json["name"], "maghrib");
        assert_eq!(json["displayName"], "Maghrib");
        assert_eq!(json["congregationOffsetMinutes"], 5);
    }
}
