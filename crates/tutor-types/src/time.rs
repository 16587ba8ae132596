//! Server-side timestamp helpers.
//!
//! Timestamps are truncated to microseconds and formatted as fixed-width
//! RFC 3339 UTC strings, so that lexical order in the store matches
//! chronological order and a record read back compares equal to the one
//! written.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current time at storage precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 rendering, e.g. `2025-01-01T00:00:00.000000Z`.
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
