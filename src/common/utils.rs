use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};

use crate::common::time_point::Timestamp;

/// Wall clock in milliseconds since unix epoch.
pub fn get_current_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// Render unix seconds (possibly fractional) as a UTC date time.
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    Utc.timestamp_opt(secs, nanos.min(999_999_999)).single()
}
