/// Observation date handling.
///
/// Dates in the `measurement` table are stored as ISO `YYYY-MM-DD` text, which
/// sorts lexically in calendar order. Every date that reaches a query goes
/// through `ObservationDate` so the string handed to the database is always
/// in that canonical form.

use chrono::{Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Wire and storage format for observation dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Length of a zero-padded `YYYY-MM-DD` string.
const DATE_LEN: usize = 10;

/// Size of the "trailing year" window used by the precipitation and tobs routes.
pub const TRAILING_WINDOW_DAYS: i64 = 365;

/// Returned when a string is not a valid `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}', expected YYYY-MM-DD")]
pub struct InvalidDate(pub String);

/// A validated calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationDate(NaiveDate);

impl ObservationDate {
    /// Parses a strict, zero-padded `YYYY-MM-DD` date.
    ///
    /// chrono alone accepts unpadded fields like `2017-8-1`, which would break
    /// lexical comparison against stored dates, so the length is checked first.
    pub fn parse(s: &str) -> Result<Self, InvalidDate> {
        if s.len() != DATE_LEN || !s.is_ascii() {
            return Err(InvalidDate(s.to_string()));
        }

        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(ObservationDate)
            .map_err(|_| InvalidDate(s.to_string()))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        ObservationDate(date)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Start of the trailing-year window ending at this date.
    ///
    /// Exactly 365 calendar days earlier, so a window crossing Feb 29 lands one
    /// day later than "same date last year".
    pub fn trailing_year_cutoff(&self) -> ObservationDate {
        ObservationDate(self.0 - Duration::days(TRAILING_WINDOW_DAYS))
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for ObservationDate {
    type Err = InvalidDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservationDate::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
