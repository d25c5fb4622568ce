//! Time windows
//!
//! Half-open `[start, end)` ranges over Unix timestamps.

use chrono::{DateTime, Utc};

/// Seconds from 00:00:00 to 23:59:59 of the same day.
const LAST_SECOND_OF_DAY: i64 = 24 * 60 * 60 - 1;

/// A half-open interval of Unix timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub start: i64,
    /// Exclusive upper bound
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The UTC calendar day enclosing `timestamp`.
    ///
    /// `end` is 23:59:59 of that day, so with the exclusive bound the final
    /// second of the day falls outside the window.
    ///
    /// Returns `None` when `timestamp` is outside chrono's representable range.
    pub fn enclosing_day(timestamp: i64) -> Option<Self> {
        let date = DateTime::<Utc>::from_timestamp(timestamp, 0)?.date_naive();
        let start = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
        Some(Self {
            start,
            end: start + LAST_SECOND_OF_DAY,
        })
    }
}
