use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use super::policy::AttendancePolicy;
use crate::utils::pagination::PageRequest;

/// Years a MySQL `DATETIME` column can hold.
const STORABLE_YEARS: RangeInclusive<i32> = 1000..=9999;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {field} date {value:?}, expected YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct RangeError {
    pub field: &'static str,
    pub value: String,
}

/// Inclusive instant bounds for a history lookup; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryRange {
    /// A bare date means the whole local day: `start` snaps to 00:00:00.000
    /// and `end` to 23:59:59.999. Timestamps without an offset are local.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        policy: &AttendancePolicy,
    ) -> Result<Self, RangeError> {
        Ok(Self {
            from: parse_bound("start", start, policy, Edge::Start)?,
            to: parse_bound("end", end, policy, Edge::End)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// `None` lists every member (admin only)
    pub member_id: Option<u64>,
    pub range: HistoryRange,
    pub page: PageRequest,
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

fn parse_bound(
    field: &'static str,
    raw: Option<&str>,
    policy: &AttendancePolicy,
    edge: Edge,
) -> Result<Option<DateTime<Utc>>, RangeError> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };

    let instant = if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        Some(instant.with_timezone(&Utc))
    } else if let Ok(local) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        policy.to_utc(local)
    } else if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        policy.day_bounds(day).map(|(first, last)| match edge {
            Edge::Start => first,
            Edge::End => last,
        })
    } else {
        None
    };

    match instant {
        Some(instant) if STORABLE_YEARS.contains(&instant.year()) => Ok(Some(instant)),
        _ => Err(RangeError {
            field,
            value: raw.to_string(),
        }),
    }
}
