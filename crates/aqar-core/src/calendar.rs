//! # Calendar Arithmetic for Installment Schedules
//!
//! Due dates are civil dates: "the 31st of January plus one month" must be
//! the last day of February, not an error and not the 3rd of March. All
//! month offsets in payment schedules resolve through [`add_months`], which
//! clamps to month end.
//!
//! Display formatting is DD/MM/YYYY as printed on reservation forms and
//! contracts; parsing accepts ISO 8601 (`YYYY-MM-DD`) as submitted by the
//! front office.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::DomainError;

/// Timezone label carried on display configuration. Schedule dates are
/// civil dates and are never converted; the label travels to the renderer.
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "Africa/Cairo";

/// Add `n` calendar months to `date`, clamping to the end of the target
/// month ("same day of next month, clamped").
///
/// # Errors
///
/// Returns a validation error if the result would leave chrono's
/// representable range (year ~262143), which no sales plan reaches.
pub fn add_months(date: NaiveDate, n: u32) -> Result<NaiveDate, DomainError> {
    date.checked_add_months(Months::new(n))
        .ok_or_else(|| DomainError::validation("month_offset", "date arithmetic out of range"))
}

/// Whole days from `from` to `to` (negative when `to` precedes `from`).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
pub fn parse_iso(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DomainError::validation("date", format!("invalid ISO date {s:?}: {e}")))
}

/// Format a date the way printed documents show it: `DD/MM/YYYY`.
pub fn format_display(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}
