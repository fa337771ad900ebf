//! General utilities shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Header Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a boolean response header the way the interview backend writes it.
///
/// Only a case-insensitive `"true"` counts; anything else (including a
/// missing header) is `false`.
#[must_use]
pub fn parse_flag_header(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Parses a numeric response header, ignoring surrounding whitespace.
#[must_use]
pub fn parse_number_header(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.trim().parse().ok())
}
