//! # Period Module
//!
//! A payroll period is a calendar month of a given year. Batches, bank account
//! effective dates and the hold rules are all keyed on it.

use crate::error::{CoreError, CoreResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar month of a year (e.g. March 2026).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayrollPeriod {
    year: i32,
    month: u32,
}

impl PayrollPeriod {
    /// Create a validated period. Month is 1..=12.
    pub fn new(year: i32, month: u32) -> CoreResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod(format!(
                "month must be 1-12, got {}",
                month
            )));
        }
        if !(1900..=9999).contains(&year) {
            return Err(CoreError::InvalidPeriod(format!("year out of range: {}", year)));
        }
        Ok(Self { year, month })
    }

    /// Period containing the given date
    pub fn containing(date: NaiveDate) -> Self {
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

    /// First calendar day of the period
    pub fn first_day(&self) -> NaiveDate {
        // Always valid: month and year are checked in `new`
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Following month
    pub fn next(&self) -> Self {
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
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Parses `YYYY-MM` (as used on the command line and in config files)
impl FromStr for PayrollPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidPeriod(format!("expected YYYY-MM, got {}", s)))?;

        let year: i32 = year
            .parse()
            .map_err(|_| CoreError::InvalidPeriod(format!("invalid year in {}", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| CoreError::InvalidPeriod(format!("invalid month in {}", s)))?;

        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_validation() {
        assert!(PayrollPeriod::new(2026, 1).is_ok());
        assert!(PayrollPeriod::new(2026, 12).is_ok());
        assert!(PayrollPeriod::new(2026, 0).is_err());
        assert!(PayrollPeriod::new(2026, 13).is_err());
    }

    #[test]
    fn test_first_day_and_display() {
        let period = PayrollPeriod::new(2026, 3).unwrap();
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(period.to_string(), "03/2026");
    }

    #[test]
    fn test_parse() {
        let period: PayrollPeriod = "2026-07".parse().unwrap();
        assert_eq!(period.year(), 2026);
        assert_eq!(period.month(), 7);

        assert!("2026/07".parse::<PayrollPeriod>().is_err());
        assert!("2026-13".parse::<PayrollPeriod>().is_err());
    }

    #[test]
    fn test_next_rolls_year() {
        let dec = PayrollPeriod::new(2025, 12).unwrap();
        assert_eq!(dec.next(), PayrollPeriod::new(2026, 1).unwrap());
    }
}
