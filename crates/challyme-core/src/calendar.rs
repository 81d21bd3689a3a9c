//! Day arithmetic. All comparisons are between UTC calendar dates; the
//! time-of-day part of a timestamp never matters.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ChallengeError;

pub fn utc_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// 1-based index of `now` within a challenge that started at `start`.
/// Zero or negative before the start date.
pub fn current_day(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (utc_date(now) - utc_date(start)).num_days() + 1
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, ChallengeError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| ChallengeError::InvalidStartDate(raw.to_string()))
}
