//! Shared utilities for the alert pipeline

pub mod error;

pub use error::{AlertflowError, Result};

use chrono::{DateTime, Timelike, Utc};

/// Milliseconds elapsed since local midnight for the given instant
pub fn ms_since_midnight(at: DateTime<Utc>) -> u32 {
    let time = at.time();
    time.num_seconds_from_midnight() * 1_000 + time.nanosecond() / 1_000_000
}

/// Truncate a string for log lines, appending an ellipsis when cut.
/// The cut always lands on a char boundary, so multi-byte text is safe.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
