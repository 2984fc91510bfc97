//! Symbolic leaderboard time windows and their cutoff timestamps.
//!
//! Every function here takes `now` explicitly; nothing reads the system
//! clock. Calendar boundaries (`since_start_of_*`) are computed in the
//! calendar of `now`'s own offset, so callers pick the local time zone by
//! choosing what `now` they pass in.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// TimeFilter
// ---------------------------------------------------------------------------

/// A closed set of time windows a board can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    #[default]
    AllTime,
    LastHour,
    LastDay,
    LastWeek,
    LastMonth,
    SinceStartOfHour,
    SinceStartOfDay,
    SinceStartOfMonth,
}

impl TimeFilter {
    /// Every filter, in display order.
    pub const ALL: [TimeFilter; 8] = [
        Self::AllTime,
        Self::LastHour,
        Self::LastDay,
        Self::LastWeek,
        Self::LastMonth,
        Self::SinceStartOfHour,
        Self::SinceStartOfDay,
        Self::SinceStartOfMonth,
    ];

    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllTime => "all_time",
            Self::LastHour => "last_hour",
            Self::LastDay => "last_day",
            Self::LastWeek => "last_week",
            Self::LastMonth => "last_month",
            Self::SinceStartOfHour => "since_start_of_hour",
            Self::SinceStartOfDay => "since_start_of_day",
            Self::SinceStartOfMonth => "since_start_of_month",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::AllTime => "All Time",
            Self::LastHour => "Last Hour",
            Self::LastDay => "Last 24 Hours",
            Self::LastWeek => "Last 7 Days",
            Self::LastMonth => "Last 30 Days",
            Self::SinceStartOfHour => "This Hour",
            Self::SinceStartOfDay => "Today",
            Self::SinceStartOfMonth => "This Month",
        }
    }

    /// Lenient parse for display paths: unknown names become `AllTime`.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(filter = %name, "Unknown time filter, falling back to all_time");
            Self::AllTime
        })
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CoreError::Configuration(format!("Unknown time filter '{s}'")))
    }
}

/// Label lookup by wire name. Unknown names get the `all_time` label.
pub fn label_for(name: &str) -> &'static str {
    name.parse::<TimeFilter>()
        .map(TimeFilter::label)
        .unwrap_or_else(|_| TimeFilter::AllTime.label())
}

// ---------------------------------------------------------------------------
// Cutoff resolution
// ---------------------------------------------------------------------------

/// Resolve the earliest `created_at` a row may have to fall inside `filter`.
///
/// Returns `None` for [`TimeFilter::AllTime`] (no cutoff at all).
pub fn resolve_cutoff<Tz: TimeZone>(filter: TimeFilter, now: &DateTime<Tz>) -> Option<Timestamp> {
    let now_utc = now.with_timezone(&Utc);
    let local = now.naive_local();

    let cutoff = match filter {
        TimeFilter::AllTime => return None,
        TimeFilter::LastHour => now_utc - Duration::hours(1),
        TimeFilter::LastDay => now_utc - Duration::hours(24),
        TimeFilter::LastWeek => now_utc - Duration::days(7),
        TimeFilter::LastMonth => now_utc - Duration::days(30),
        TimeFilter::SinceStartOfHour => {
            let start = local
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(local);
            to_utc(now, start)
        }
        TimeFilter::SinceStartOfDay => to_utc(now, local.date().and_time(NaiveTime::MIN)),
        TimeFilter::SinceStartOfMonth => {
            let date = local.date();
            let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
            to_utc(now, first.and_time(NaiveTime::MIN))
        }
    };

    Some(cutoff)
}

/// Whether a row created at `created_at` falls inside the window. Inclusive.
pub fn is_within(cutoff: Option<Timestamp>, created_at: Timestamp) -> bool {
    cutoff.map_or(true, |c| created_at >= c)
}

/// Interpret a wall-clock boundary in `now`'s current UTC offset.
fn to_utc<Tz: TimeZone>(now: &DateTime<Tz>, local: NaiveDateTime) -> Timestamp {
    let offset_secs = i64::from(now.offset().fix().local_minus_utc());
    Utc.from_utc_datetime(&(local - Duration::seconds(offset_secs)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
