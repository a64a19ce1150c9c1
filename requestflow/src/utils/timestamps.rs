//! Wall-clock timestamp helpers.
//!
//! TTL records are absolute expiration instants stored as Unix epoch
//! milliseconds, so they survive a process restart when kept in the disk vault.

use chrono::{TimeZone, Utc};
use std::time::Duration;

/// Returns the current wall-clock time in Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the epoch-millisecond instant `ttl` after `now_ms`.
///
/// Saturates instead of overflowing for very large TTLs.
#[must_use]
pub fn expiration_after(now_ms: i64, ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_add(ttl_ms)
}

/// Formats epoch milliseconds as an RFC 3339 string for log output.
#[must_use]
pub fn format_millis(epoch_ms: i64) -> String {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map_or_else(|| epoch_ms.to_string(), |dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_expiration_after() {
        assert_eq!(expiration_after(1_000, Duration::from_secs(600)), 601_000);
    }

    #[test]
    fn test_expiration_after_saturates() {
        assert_eq!(expiration_after(i64::MAX - 1, Duration::from_secs(10)), i64::MAX);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
    }
}
