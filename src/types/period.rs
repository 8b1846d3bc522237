//! Calendar helpers used to express date windows: [`Year`], [`Month`], the
//! inclusive [`DateRange`] and the [`AnyDate`] conversion trait.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Date format used by the NASA POWER API for request parameters and response keys.
pub(crate) const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// A calendar year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Year(pub i32);

impl Year {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month of a specific year, stored as `(year, month)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// An inclusive range of calendar days. `start` is never after `end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, returning `None` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Builds a range from two [`AnyDate`] bounds: the start of `start` up to the end of `end`.
    pub fn between(start: impl AnyDate, end: impl AnyDate) -> Option<Self> {
        Self::new(start.date_range()?.start, end.date_range()?.end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the range, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Anything that can be resolved to an inclusive [`DateRange`].
///
/// A single day resolves to a one-day range, a [`Month`] or [`Year`] to all of
/// its days. Strings are accepted as `YYYY-MM-DD` or the compact `YYYYMMDD`.
pub trait AnyDate {
    fn date_range(self) -> Option<DateRange>;
}

impl AnyDate for NaiveDate {
    fn date_range(self) -> Option<DateRange> {
        DateRange::new(self, self)
    }
}

impl AnyDate for &str {
    fn date_range(self) -> Option<DateRange> {
        NaiveDate::parse_from_str(self, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(self, COMPACT_DATE_FORMAT))
            .ok()?
            .date_range()
    }
}

impl AnyDate for String {
    fn date_range(self) -> Option<DateRange> {
        self.as_str().date_range()
    }
}

impl AnyDate for Year {
    fn date_range(self) -> Option<DateRange> {
        DateRange::new(
            NaiveDate::from_ymd_opt(self.0, 1, 1)?,
            NaiveDate::from_ymd_opt(self.0, 12, 31)?,
        )
    }
}

impl AnyDate for Month {
    fn date_range(self) -> Option<DateRange> {
        let (year, month) = (self.year(), self.month());
        DateRange::new(
            NaiveDate::from_ymd_opt(year, month, 1)?,
            NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?,
        )
    }
}

impl AnyDate for DateRange {
    fn date_range(self) -> Option<DateRange> {
        Some(self)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_of_next - Duration::days(1)).day())
}

pub(crate) fn to_compact(date: NaiveDate) -> String {
    date.format(COMPACT_DATE_FORMAT).to_string()
}

pub(crate) fn parse_compact(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, COMPACT_DATE_FORMAT).ok()
}

/// January 1st, `years_back` years before the year of `today`.
pub fn first_day_years_back(today: NaiveDate, years_back: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(today.year().checked_sub(years_back)?, 1, 1)
}
