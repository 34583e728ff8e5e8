//! Calendar Period Module
//! Month enumeration and `YY-Mon` period labels with chronological ordering.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid period label '{0}': expected YY-Mon (e.g. 24-Jan)")]
    InvalidLabel(String),
    #[error("Unknown month abbreviation '{0}'")]
    UnknownMonth(String),
}

/// Calendar month. Variant order is the calendar order, so `Ord` is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// Canonical calendar sequence.
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn abbrev(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }
}

impl FromStr for Month {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.abbrev().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PeriodError::UnknownMonth(trimmed.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// A reporting month, labelled `YY-Mon` in the source tables.
///
/// Field order matters: the derived `Ord` compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: u16,
    pub month: Month,
}

impl Period {
    pub fn new(year: u16, month: Month) -> Self {
        Self { year, month }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    /// Parse `24-Jan` style labels. Two-digit years are taken as 20YY.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let (year, month) = label
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidLabel(label.to_string()))?;

        let year = year.trim();
        if year.len() != 2 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(PeriodError::InvalidLabel(label.to_string()));
        }
        let yy: u16 = year
            .parse()
            .map_err(|_| PeriodError::InvalidLabel(label.to_string()))?;

        Ok(Period::new(2000 + yy, month.parse()?))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.year % 100, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
