//! Civil-date stay ranges and the hotel-night overlap primitive

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Do `[query_start, query_end)` and `[other_start, other_end)` share a night?
///
/// Ranges that only touch (one ends on the day the other starts) do not overlap:
/// the departure day is free for the next arrival.
pub fn overlaps(
    query_start: NaiveDate,
    query_end: NaiveDate,
    other_start: NaiveDate,
    other_end: NaiveDate,
) -> bool {
    query_start.max(other_start) < query_end.min(other_end)
}

/// A validated half-open range of civil dates in the reference timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::InvalidDateRange(format!(
                "start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Normalize two instants to reference-timezone midnights
    pub fn from_instants<Tz: TimeZone>(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        reference: FixedOffset,
    ) -> AppResult<Self> {
        Self::new(
            start.with_timezone(&reference).date_naive(),
            end.with_timezone(&reference).date_naive(),
        )
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn overlaps_dates(&self, start: NaiveDate, end: NaiveDate) -> bool {
        overlaps(self.start, self.end, start, end)
    }

    pub fn contains_night(&self, night: NaiveDate) -> bool {
        self.start <= night && night < self.end
    }

    pub fn night_count(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Each night of the stay, identified by its arrival date
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.night_count()).map(move |offset| start + Duration::days(offset))
    }
}

impl std::fmt::Display for StayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
