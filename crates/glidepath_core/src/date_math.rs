//! Calendar-month arithmetic for the monthly stepping loop.
//!
//! The engine never needs day resolution, so months are represented by a
//! compact [`YearMonth`] with an absolute month index
//! (`year * 12 + month - 1`). Differences and offsets are O(1) integer math;
//! `jiff` is only involved when converting to or from a civil date.

use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i16,
    month: i8,
}

impl YearMonth {
    /// Create a month, rejecting month numbers outside 1..=12
    pub fn new(year: i16, month: i8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SimulationError::validation(
                "month",
                format!("month must be between 1 and 12, but was {month}"),
            ));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub fn year(self) -> i16 {
        self.year
    }

    #[must_use]
    pub fn month(self) -> i8 {
        self.month
    }

    /// Absolute month number; consecutive months differ by exactly one
    #[inline]
    #[must_use]
    pub fn index(self) -> i32 {
        i32::from(self.year) * 12 + i32::from(self.month) - 1
    }

    /// Inverse of [`YearMonth::index`]
    pub fn from_index(index: i32) -> Result<Self> {
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) + 1;
        let year = i16::try_from(year).map_err(|_| {
            SimulationError::calculation(format!("month index {index} is out of range"))
        })?;
        Ok(Self {
            year,
            month: month as i8,
        })
    }

    /// The month `n` months after (or before, if negative) this one
    pub fn offset(self, n: i32) -> Result<Self> {
        Self::from_index(self.index() + n)
    }

    pub fn next(self) -> Result<Self> {
        self.offset(1)
    }

    /// Signed number of months from `self` to `other`
    #[inline]
    #[must_use]
    pub fn months_until(self, other: YearMonth) -> i32 {
        other.index() - self.index()
    }

    /// Whole years between `self` and a later month (zero if `later` is earlier)
    #[must_use]
    pub fn whole_years_until(self, later: YearMonth) -> i32 {
        self.months_until(later).max(0) / 12
    }

    #[must_use]
    pub fn is_january(self) -> bool {
        self.month == 1
    }

    #[must_use]
    pub fn is_december(self) -> bool {
        self.month == 12
    }

    /// First day of the month as a civil date
    #[must_use]
    pub fn first_day(self) -> Date {
        jiff::civil::date(self.year, self.month, 1)
    }

    #[must_use]
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            SimulationError::validation("month", format!("expected YYYY-MM, but was '{s}'"))
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i16>().map_err(|_| invalid())?;
        let month = month.parse::<i8>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Inclusive range of calendar months.
///
/// `Copy` and restartable: every call to [`MonthRange::iter`] (or
/// `into_iter`) yields the full sequence again from the first month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

impl MonthRange {
    #[must_use]
    pub fn first(&self) -> YearMonth {
        self.start
    }

    #[must_use]
    pub fn last(&self) -> YearMonth {
        self.end
    }

    /// Number of months, counting both ends
    #[must_use]
    pub fn len(&self) -> usize {
        (self.start.months_until(self.end) + 1) as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    #[must_use]
    pub fn iter(&self) -> MonthIter {
        MonthIter {
            next: self.start.index(),
            end: self.end.index(),
        }
    }
}

impl IntoIterator for MonthRange {
    type Item = YearMonth;
    type IntoIter = MonthIter;

    fn into_iter(self) -> MonthIter {
        self.iter()
    }
}

impl IntoIterator for &MonthRange {
    type Item = YearMonth;
    type IntoIter = MonthIter;

    fn into_iter(self) -> MonthIter {
        self.iter()
    }
}

/// Iterator over a [`MonthRange`]
#[derive(Debug, Clone)]
pub struct MonthIter {
    next: i32,
    end: i32,
}

impl Iterator for MonthIter {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        if self.next > self.end {
            return None;
        }
        let month = YearMonth::from_index(self.next).ok()?;
        self.next += 1;
        Some(month)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next + 1).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthIter {}

/// Ordered months from `start` to `end`, both inclusive.
///
/// Fails with a validation error when `start` is after `end`.
pub fn generate_months(start: YearMonth, end: YearMonth) -> Result<MonthRange> {
    if start > end {
        return Err(SimulationError::validation(
            "start",
            format!("start month {start} is after end month {end}"),
        ));
    }
    Ok(MonthRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i16, month: i8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_month_validation() {
        assert!(YearMonth::new(2025, 0).is_err());
        assert!(YearMonth::new(2025, 13).is_err());
        assert!(YearMonth::new(2025, 12).is_ok());
    }

    #[test]
    fn test_index_roundtrip() {
        for m in [ym(2024, 1), ym(2024, 12), ym(1999, 6), ym(2100, 3)] {
            assert_eq!(YearMonth::from_index(m.index()).unwrap(), m);
        }
    }

    #[test]
    fn test_offset_across_year_boundary() {
        assert_eq!(ym(2024, 11).offset(3).unwrap(), ym(2025, 2));
        assert_eq!(ym(2025, 1).offset(-1).unwrap(), ym(2024, 12));
        assert_eq!(ym(2024, 12).next().unwrap(), ym(2025, 1));
    }

    #[test]
    fn test_whole_years() {
        assert_eq!(ym(2025, 1).whole_years_until(ym(2025, 12)), 0);
        assert_eq!(ym(2025, 1).whole_years_until(ym(2026, 1)), 1);
        assert_eq!(ym(2025, 6).whole_years_until(ym(2028, 5)), 2);
        assert_eq!(ym(2025, 6).whole_years_until(ym(2020, 5)), 0);
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(ym(2024, 12) < ym(2025, 1));
        assert!(ym(2025, 2) > ym(2025, 1));
    }

    #[test]
    fn test_string_form() {
        assert_eq!(ym(2025, 3).to_string(), "2025-03");
        assert_eq!("2031-11".parse::<YearMonth>().unwrap(), ym(2031, 11));
        assert!("2031/11".parse::<YearMonth>().is_err());
        assert!("2031-13".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_date_conversion() {
        let d = jiff::civil::date(2030, 7, 19);
        assert_eq!(YearMonth::from_date(d), ym(2030, 7));
        assert_eq!(ym(2030, 7).first_day(), jiff::civil::date(2030, 7, 1));
    }

    #[test]
    fn test_generate_months_spans_year_boundary() {
        let range = generate_months(ym(2024, 11), ym(2025, 2)).unwrap();
        let months: Vec<_> = range.iter().collect();
        assert_eq!(
            months,
            vec![ym(2024, 11), ym(2024, 12), ym(2025, 1), ym(2025, 2)]
        );
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_generate_months_single_month() {
        let range = generate_months(ym(2025, 5), ym(2025, 5)).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.iter().next(), Some(ym(2025, 5)));
    }

    #[test]
    fn test_generate_months_rejects_reversed_range() {
        let err = generate_months(ym(2025, 2), ym(2025, 1)).unwrap_err();
        assert!(matches!(err, SimulationError::Validation { field: "start", .. }));
    }

    #[test]
    fn test_month_range_is_restartable() {
        let range = generate_months(ym(2025, 1), ym(2025, 12)).unwrap();
        let first_pass: Vec<_> = range.into_iter().collect();
        let second_pass: Vec<_> = range.into_iter().collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(range.iter().len(), 12);
    }
}
