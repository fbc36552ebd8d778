//! Microsecond timestamps as stored in `*_at_us` columns.

use chrono::{DateTime, Utc};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Convert a stored microsecond value back to a UTC datetime.
///
/// Values outside chrono's representable range clamp to the epoch.
#[must_use]
pub fn from_us(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}
