//! Time bucketing for aggregation and cohort jobs.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parses the wire string; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start date of the bucket containing `ts`.
///
/// Weekly buckets start on the Sunday of the event's own recorded UTC
/// timestamp, monthly buckets on the first of the month.
pub fn bucket_start(ts: DateTime<Utc>, granularity: Granularity) -> NaiveDate {
    let date = ts.date_naive();
    match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => {
            date - Duration::days(date.weekday().num_days_from_sunday() as i64)
        }
        Granularity::Monthly => {
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
        }
    }
}

/// Bucket key for `ts`: `YYYY-MM-DD` for daily and weekly, `YYYY-MM` for
/// monthly.
///
/// Keys compare lexicographically in chronological order, so stores can
/// range-scan on them.
pub fn bucket_key(ts: DateTime<Utc>, granularity: Granularity) -> String {
    let start = bucket_start(ts, granularity);
    match granularity {
        Granularity::Monthly => start.format("%Y-%m").to_string(),
        _ => start.format("%Y-%m-%d").to_string(),
    }
}

/// Half-open `[start, end)` time range. `end == None` means unbounded,
/// used for conversion-event fetches that outlive their cohort window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Unbounded above.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && self.end.map_or(true, |end| ts < end)
    }
}
