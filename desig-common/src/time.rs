//! Timestamp utilities

use chrono::{DateTime, Datelike, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Two-digit year token of a detection time (calendar year modulo 100)
pub fn year_token(detection_time: &DateTime<Utc>) -> u8 {
    detection_time.year().rem_euclid(100) as u8
}

/// Parse an RFC 3339 timestamp as stored in the candidate table
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_year_token_is_year_mod_100() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(year_token(&t), 24);

        let t = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(year_token(&t), 0);

        let t = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(year_token(&t), 99);
    }

    #[test]
    fn test_parse_timestamp_normalizes_to_utc() {
        let t = parse_timestamp("2025-01-01T01:30:00+02:00").unwrap();
        // Still 2024 in UTC
        assert_eq!(year_token(&t), 24);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(Error::InvalidInput(_))
        ));
    }
}
