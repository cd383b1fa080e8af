//! Utility functions for the lane assignment coordinator

use chrono::{DateTime, Duration, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Format a duration as a m:ss clock string, flooring at zero
pub fn format_clock(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{}:{:02}", total / 60, total % 60)
}
