//! Time-window calculator
//!
//! Computes the inclusive lower bound (`oldest`) for the history fetch.
//! There is no upper bound; every run scans up to "now".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, LocalResult, NaiveTime};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// The channel operates on Tokyo wall-clock time.
pub const CHANNEL_TZ: Tz = chrono_tz::Asia::Tokyo;

/// Lower-bound policy for the history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// 00:00:00 of the current local day.
    MidnightToday,
    /// 20:00:00 of the previous local day.
    PreviousDayEvening,
}

impl TimeWindow {
    /// Unix timestamp of the window's lower bound relative to `now`.
    pub fn oldest_ts(&self, now: DateTime<Tz>) -> i64 {
        let (date, time) = match self {
            TimeWindow::MidnightToday => (now.date_naive(), NaiveTime::MIN),
            TimeWindow::PreviousDayEvening => (
                now.date_naive() - Days::new(1),
                NaiveTime::from_hms_opt(20, 0, 0).expect("20:00:00 is a valid wall-clock time"),
            ),
        };

        match date.and_time(time).and_local_timezone(now.timezone()) {
            LocalResult::Single(dt) => dt.timestamp(),
            LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
            // Skipped wall-clock time (DST gap); fall back to "now",
            // which yields an empty window rather than a wrong one.
            LocalResult::None => now.timestamp(),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "midnight-today" | "midnight" => Ok(TimeWindow::MidnightToday),
            "previous-day-evening" | "evening" => Ok(TimeWindow::PreviousDayEvening),
            other => Err(Error::Config(format!(
                "unknown time window: {} (expected midnight-today or previous-day-evening)",
                other
            ))),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::MidnightToday => write!(f, "midnight-today"),
            TimeWindow::PreviousDayEvening => write!(f, "previous-day-evening"),
        }
    }
}
