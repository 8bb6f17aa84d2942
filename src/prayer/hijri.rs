//! Tabular Islamic calendar for the offline Hijri date label.
//!
//! The arithmetical (Kuwaiti) calendar can differ from the sighted calendar
//! and from Umm al-Qura by a day, which is acceptable while the provider is
//! unreachable. It runs a day behind around 1446: 2024-07-08 is 1 Muharram
//! here and 2 Muharram in the provider's label.

use chrono::{Datelike, NaiveDate};

/// Arabic month names, Muharram first.
pub const MONTHS_AR: [&str; 12] = [
    "محرم",
    "صفر",
    "ربيع الأول",
    "ربيع الآخر",
    "جمادى الأولى",
    "جمادى الآخرة",
    "رجب",
    "شعبان",
    "رمضان",
    "شوال",
    "ذو القعدة",
    "ذو الحجة",
];

// Offset from chrono's day count (0001-01-01 = 1) to the Julian Day Number
const JDN_OFFSET: i64 = 1_721_425;

/// A date in the tabular Islamic calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HijriDate {
    pub year: i64,
    /// 1..=12
    pub month: u32,
    /// 1..=30
    pub day: u32,
}

impl HijriDate {
    /// Convert a Gregorian date.
    pub fn from_gregorian(date: NaiveDate) -> Self {
        let jdn = i64::from(date.num_days_from_ce()) + JDN_OFFSET;

        let mut days = jdn - 1_948_440 + 10_632;
        let cycles = (days - 1) / 10_631;
        days = days - 10_631 * cycles + 354;
        let j = ((10_985 - days) / 5_316) * ((50 * days) / 17_719)
            + (days / 5_670) * ((43 * days) / 15_238);
        days = days - ((30 - j) / 15) * ((17_719 * j) / 50) - (j / 16) * ((15_238 * j) / 43) + 29;
        let month = (24 * days) / 709;
        let day = days - (709 * month) / 24;
        let year = 30 * cycles + j - 30;

        Self {
            year,
            month: month.clamp(1, 12) as u32,
            day: day.clamp(1, 30) as u32,
        }
    }

    pub fn month_name(&self) -> &'static str {
        MONTHS_AR[(self.month as usize).saturating_sub(1).min(11)]
    }

    /// Label in the provider's format: `"{day} {month} {year} هـ"`.
    pub fn label(&self) -> String {
        format!("{} {} {} هـ", self.day, self.month_name(), self.year)
    }
}

/// Hijri label for a Gregorian date.
pub fn hijri_label(date: NaiveDate) -> String {
    HijriDate::from_gregorian(date).label()
}
