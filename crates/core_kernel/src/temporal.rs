//! Month-granular time handling
//!
//! Enrollment is tracked at the granularity of calendar months. This module
//! provides [`YearMonth`] for walking month by month, plus the handful of
//! calendar helpers the coverage domains share (ages, trailing windows,
//! timestamp to date conversion).

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Date arithmetic out of range from {0}")]
    OutOfRange(String),
}

/// A calendar month in a specific year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a year-month, validating that `month` is in 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    /// January of the given year
    pub fn january(year: i32) -> Self {
        Self { year, month: 1 }
    }

    /// The month containing the given date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("YearMonth always holds a valid month")
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .expect("day before the first of a month exists")
    }

    /// Iterates every month from `self` through `end`, both inclusive
    pub fn through(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(self), move |m| {
            let next = m.succ();
            (next <= end).then_some(next)
        })
        .take_while(move |m| *m <= end)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Converts a simulation timestamp to its calendar date (UTC)
pub fn to_date(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Midnight UTC at the start of the given date
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Midnight UTC on January 1st of the given year
pub fn start_of_year(year: i32) -> DateTime<Utc> {
    start_of_day(YearMonth::january(year).first_day())
}

/// Completed years between `birth_date` and `on`
pub fn age_in_years(birth_date: NaiveDate, on: NaiveDate) -> u32 {
    on.years_since(birth_date).unwrap_or(0)
}

/// The same instant one calendar year earlier
pub fn one_year_before(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>, TemporalError> {
    timestamp
        .checked_sub_months(Months::new(12))
        .ok_or_else(|| TemporalError::OutOfRange(timestamp.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_validation() {
        assert!(YearMonth::new(2020, 0).is_err());
        assert!(YearMonth::new(2020, 13).is_err());
        assert!(YearMonth::new(2020, 12).is_ok());
    }

    #[test]
    fn test_succ_wraps_year() {
        let dec = YearMonth::new(2020, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::january(2021));
    }

    #[test]
    fn test_last_day_handles_leap_years() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_through_is_inclusive() {
        let start = YearMonth::new(2019, 11).unwrap();
        let end = YearMonth::new(2020, 2).unwrap();
        let months: Vec<_> = start.through(end).collect();
        assert_eq!(months.len(), 4);
        assert_eq!(months[0], start);
        assert_eq!(months[3], end);
    }

    #[test]
    fn test_through_empty_when_reversed() {
        let start = YearMonth::new(2020, 3).unwrap();
        let end = YearMonth::new(2020, 2).unwrap();
        assert_eq!(start.through(end).count(), 0);
    }

    #[test]
    fn test_age_in_years() {
        let birth = NaiveDate::from_ymd_opt(1950, 6, 15).unwrap();
        assert_eq!(age_in_years(birth, NaiveDate::from_ymd_opt(2015, 6, 14).unwrap()), 64);
        assert_eq!(age_in_years(birth, NaiveDate::from_ymd_opt(2015, 6, 15).unwrap()), 65);
        assert_eq!(age_in_years(birth, NaiveDate::from_ymd_opt(1940, 1, 1).unwrap()), 0);
    }
}
