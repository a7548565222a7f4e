//! Month keys for archive partitions.
//!
//! A month key renders as `YYYY-MM`, so string order and chronological order
//! agree for years 0000-9999.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidInput(format!("month out of range: {month}")));
        }
        if !(0..=9999).contains(&year) {
            return Err(Error::InvalidInput(format!("year out of range: {year}")));
        }
        Ok(Self { year, month })
    }

    /// Month (UTC) containing `ts`.
    pub fn of(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Months from `self` backward to `oldest`, both inclusive, newest first.
    ///
    /// Empty when `oldest` is later than `self`.
    pub fn back_to(self, oldest: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        if oldest > self {
            return months;
        }
        let mut current = self;
        loop {
            months.push(current);
            if current == oldest {
                break;
            }
            current = current.previous();
        }
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid month key '{value}' (expected YYYY-MM)"));
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month)
    }
}
