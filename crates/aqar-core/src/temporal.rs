//! # UTC Timestamps for Audit Rows
//!
//! Every workflow transition is stamped with a [`Timestamp`]: UTC only,
//! truncated to seconds. Audit-history monotonicity checks compare these
//! values across processes, so sub-second noise and local offsets are
//! removed at construction rather than at comparison time.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A UTC timestamp at seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] for the wall clock (ports should prefer the
///   `Clock` port so tests stay deterministic).
/// - [`Timestamp::parse()`] from an RFC 3339 string; any offset is
///   converted to UTC.
/// - [`Timestamp::from_utc()`] from a `chrono::DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 timestamp, converting any offset to UTC.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            DomainError::validation("timestamp", format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From a Unix epoch timestamp in seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, DomainError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            DomainError::validation("timestamp", format!("invalid Unix timestamp: {secs}"))
        })?;
        Ok(Self(dt))
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The UTC calendar date of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// This instant shifted forward by whole days. Used for block expiry
    /// deadlines.
    pub fn plus_days(&self, days: u32) -> Self {
        Self(self.0 + chrono::Duration::days(i64::from(days)))
    }

    /// Render as ISO 8601 with Z suffix (`2026-08-23T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
