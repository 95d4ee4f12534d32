//! Claim number generation
//!
//! Numbers look like `CLM-20240115-0042`: the business date the claim was
//! first saved plus a four-digit sequence for that day. The next sequence
//! is read from the highest existing number with the day's prefix; the
//! unique constraint in the store catches races and the service retries.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::ClaimError;

pub const CLAIM_NUMBER_PREFIX: &str = "CLM";

/// Highest sequence number available per day
pub const MAX_SEQUENCE: u32 = 9999;

/// A parsed claim number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimNumber {
    date: NaiveDate,
    sequence: u32,
}

impl ClaimNumber {
    pub fn new(date: NaiveDate, sequence: u32) -> Result<Self, ClaimError> {
        if sequence == 0 {
            return Err(ClaimError::validation("claim number sequence starts at 1"));
        }
        if sequence > MAX_SEQUENCE {
            return Err(ClaimError::SequenceExhausted(Self::day_prefix(date)));
        }
        Ok(Self { date, sequence })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Prefix shared by every claim number of a day, e.g. `CLM-20240115-`
    pub fn day_prefix(date: NaiveDate) -> String {
        format!("{}-{}-", CLAIM_NUMBER_PREFIX, date.format("%Y%m%d"))
    }

    /// Next number for `date` given the highest number stored under its prefix
    pub fn next_after(date: NaiveDate, latest: Option<&str>) -> Result<Self, ClaimError> {
        match latest {
            None => Self::new(date, 1),
            Some(latest) => {
                let previous: ClaimNumber = latest.parse()?;
                if previous.date != date {
                    return Self::new(date, 1);
                }
                Self::new(date, previous.sequence + 1)
            }
        }
    }
}

impl fmt::Display for ClaimNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", Self::day_prefix(self.date), self.sequence)
    }
}

impl FromStr for ClaimNumber {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ClaimError::validation(format!("malformed claim number '{}'", s));

        let mut parts = s.split('-');
        let (prefix, date, sequence) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(date), Some(sequence), None) => (prefix, date, sequence),
            _ => return Err(malformed()),
        };
        if prefix != CLAIM_NUMBER_PREFIX || date.len() != 8 || sequence.len() != 4 {
            return Err(malformed());
        }
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| malformed())?;
        let sequence: u32 = sequence.parse().map_err(|_| malformed())?;
        Self::new(date, sequence).map_err(|_| malformed())
    }
}
