//! Time utilities for fuelwatch
//!
//! Cache deadlines reported by the upstream API are wall-clock instants, while
//! the scheduler sleeps on durations. This module bridges the two.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `FUELWATCH_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for replaying upstream responses whose `cached_until` lies in the past.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "FUELWATCH_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Mock offset, resolved on first use
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn parse_mock_time(value: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value, MOCK_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

#[cfg(debug_assertions)]
#[allow(clippy::disallowed_methods)]
fn resolve_mock_offset() -> Option<chrono::Duration> {
    let value = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
    let Some(mock) = parse_mock_time(&value) else {
        tracing::warn!(value = %value, format = MOCK_TIME_FORMAT, "Ignoring malformed mock time");
        return None;
    };

    let offset = mock.signed_duration_since(chrono::Local::now());
    tracing::info!(mock_time = %value, offset_secs = offset.num_seconds(), "Mock time enabled");
    Some(offset)
}

#[cfg(not(debug_assertions))]
fn resolve_mock_offset() -> Option<chrono::Duration> {
    None
}

/// Current wall-clock time, shifted by the mock offset in debug builds.
#[allow(clippy::disallowed_methods)]
pub fn now() -> DateTime<Local> {
    let real = chrono::Local::now();
    match *MOCK_TIME_OFFSET.get_or_init(resolve_mock_offset) {
        Some(offset) => real + offset,
        None => real,
    }
}

/// Upper bound applied by [`deadline_after`]
const MAX_DEADLINE_DAYS: i64 = 365 * 100;

/// Wall-clock instant `delay` after `now`, capped at a hundred years out.
pub fn deadline_after(now: DateTime<Local>, delay: Duration) -> DateTime<Local> {
    let cap = chrono::Duration::days(MAX_DEADLINE_DAYS);
    let delay = chrono::Duration::from_std(delay).unwrap_or(cap).min(cap);
    now.checked_add_signed(delay).unwrap_or(now)
}

/// Time left until `deadline`, or zero if it has already passed.
pub fn duration_until(deadline: DateTime<Local>, now: DateTime<Local>) -> Duration {
    deadline
        .signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// `1h 2m 3s` style rendering of a duration
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a number of operating hours as days and hours (`"1d 12h"`).
pub fn format_hours(hours: u64) -> String {
    let days = hours / 24;
    let rest = hours % 24;

    match (days, rest) {
        (0, h) => format!("{}h", h),
        (d, 0) => format!("{}d", d),
        (d, h) => format!("{}d {}h", d, h),
    }
}
