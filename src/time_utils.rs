// SPDX-License-Identifier: MIT

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as RFC3339 with a `Z` suffix.
///
/// All stored timestamps go through this so that lexicographic ordering
/// of the TEXT columns matches chronological ordering.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}
