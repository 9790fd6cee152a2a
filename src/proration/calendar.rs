//! Calendar month arithmetic and fiscal-quarter lookup

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ProrationError, Result};

fn check_month(month: u32) -> Result<u32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(ProrationError::InvalidMonth(month))
    }
}

/// A calendar month bucket, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = ProrationError;

    fn try_from(raw: RawYearMonth) -> Result<Self> {
        Self::new(raw.year, raw.month)
    }
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        Ok(Self { year, month: check_month(month)? })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    /// 1..=12
    pub fn month(self) -> u32 {
        self.month
    }

    /// Following month; December wraps to January of the next year
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Months since year 0, used for span arithmetic
    pub fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn days(self) -> u32 {
        month_length(self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Number of days in a Gregorian calendar month (28-31)
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    Ok(month_length(year, check_month(month)?))
}

// `month` already validated
fn month_length(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Count of distinct calendar months touched by `[start, end]`
pub fn months_between_inclusive(start: YearMonth, end: YearMonth) -> i64 {
    end.ordinal() - start.ordinal() + 1
}

/// Fiscal year and quarter of a calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalQuarter {
    pub fiscal_year: i32,
    /// 1..=4
    pub quarter: u32,
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{} Q{}", self.fiscal_year, self.quarter)
    }
}

/// Fiscal calendar defined by the month in which the fiscal year starts.
///
/// A fiscal year that starts in a month other than January is named after
/// the calendar year in which it ends, so with the default December start,
/// December 2024 belongs to Q1 of FY2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFiscalCalendar")]
pub struct FiscalCalendar {
    start_month: u32,
}

#[derive(Deserialize)]
struct RawFiscalCalendar {
    start_month: u32,
}

impl TryFrom<RawFiscalCalendar> for FiscalCalendar {
    type Error = ProrationError;

    fn try_from(raw: RawFiscalCalendar) -> Result<Self> {
        Self::new(raw.start_month)
    }
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self { start_month: 12 }
    }
}

impl FiscalCalendar {
    pub fn new(start_month: u32) -> Result<Self> {
        Ok(Self { start_month: check_month(start_month)? })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn quarter_of(&self, year: i32, month: u32) -> Result<FiscalQuarter> {
        Ok(self.quarter_of_month(YearMonth::new(year, month)?))
    }

    pub fn quarter_of_month(&self, ym: YearMonth) -> FiscalQuarter {
        // Months elapsed since the fiscal year began, 0..=11
        let offset = (ym.month + 12 - self.start_month) % 12;
        let fiscal_year = if self.start_month != 1 && ym.month >= self.start_month {
            ym.year + 1
        } else {
            ym.year
        };
        FiscalQuarter {
            fiscal_year,
            quarter: offset / 3 + 1,
        }
    }

    /// Calendar months belonging to a fiscal quarter, in fiscal order.
    /// Anything outside 1..=4 yields an empty list.
    pub fn months_in_quarter(&self, quarter: u32) -> Vec<u32> {
        if !(1..=4).contains(&quarter) {
            return Vec::new();
        }
        let first = (quarter - 1) * 3;
        (first..first + 3)
            .map(|offset| (self.start_month - 1 + offset) % 12 + 1)
            .collect()
    }
}
