//! Data models for the per-user ledger.
//!
//! Each submodule holds one entity of the ledger together with the request
//! bodies that create or modify it. Shared parsing helpers for the closed
//! string enums and for client-supplied timestamps live here.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Current cash/online balance
pub mod balance;
/// Per-category spending limits
pub mod budget;
/// Expense records
pub mod expense;
/// User profile document
pub mod profile;
/// Recurring-expense templates
pub mod recurring;
/// Analytics output shapes
pub mod stats;

/// A string that does not name any variant of one of the closed enums
/// (payment type, budget period, recurring frequency).
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Parse a client-supplied timestamp.
///
/// Accepts a full RFC 3339 timestamp (`2025-01-15T10:30:00Z`) or a bare
/// calendar date (`2025-01-15`). A bare date resolves to the first instant of
/// that day in UTC, or to its last instant when `end_of_day` is set so that an
/// inclusive upper bound covers the whole day.
pub fn parse_timestamp(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));

    if end_of_day {
        Some(start + Duration::days(1) - Duration::nanoseconds(1))
    } else {
        Some(start)
    }
}

/// Midnight (UTC) of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Midnight (UTC) of the first day of the month containing `now`.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}
