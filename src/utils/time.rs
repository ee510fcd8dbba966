use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// `SystemTime` `millis` milliseconds after the Unix epoch. Negative values
/// clamp to the epoch.
pub fn system_time_from_millis(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
}

/// RFC 7231 date, as used by `Expires` and `Last-Modified`
pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Milliseconds since the Unix epoch
pub fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
