use crate::error::{ProcessingError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a UTC timestamp as written by the temperature and load feeds.
///
/// Accepts RFC 3339 (any offset, normalised to UTC), naive ISD style
/// timestamps (`2024-07-01T13:51:00`) and the hourly period form
/// (`2024-07-01T13`). Naive values are taken to be UTC.
///
/// # Examples
/// ```
/// use heatgrid_processor::utils::time::parse_utc_timestamp;
///
/// let ts = parse_utc_timestamp("2024-07-01T13").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2024-07-01T13:00:00+00:00");
/// ```
pub fn parse_utc_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Hourly period form carries no minutes
    let candidate = if is_hour_period(trimmed) {
        format!("{}:00", trimmed)
    } else {
        trimmed.to_string()
    };

    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(ProcessingError::InvalidFormat(format!(
        "Unrecognised timestamp: '{}'",
        raw
    )))
}

fn is_hour_period(value: &str) -> bool {
    value.len() == 13 && value.as_bytes()[10] == b'T'
}

/// Truncate (never round) a timestamp to the top of its hour.
pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(ts.hour(), 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(ts)
}

/// UTC calendar day of a timestamp.
pub fn utc_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Days since 1970-01-01, the Arrow `Date32` representation.
pub fn days_since_epoch(day: NaiveDate) -> i32 {
    (day - NaiveDate::default()).num_days() as i32
}

pub fn from_days_since_epoch(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::days(days as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 1, 13, 51, 0).unwrap();

        assert_eq!(parse_utc_timestamp("2024-07-01T13:51:00").unwrap(), expected);
        assert_eq!(parse_utc_timestamp("2024-07-01 13:51:00").unwrap(), expected);
        assert_eq!(parse_utc_timestamp("2024-07-01T13:51").unwrap(), expected);
        assert_eq!(parse_utc_timestamp("2024-07-01T13:51:00Z").unwrap(), expected);
        assert_eq!(
            parse_utc_timestamp("2024-07-01T09:51:00-04:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_utc_timestamp("2024-07-01T13").unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_utc_timestamp("yesterday").is_err());
        assert!(parse_utc_timestamp("2024-13-01T00:00:00").is_err());
        assert!(parse_utc_timestamp("").is_err());
    }

    #[test]
    fn test_truncate_not_round() {
        let late = Utc.with_ymd_and_hms(2024, 7, 1, 13, 59, 59).unwrap();
        assert_eq!(
            truncate_to_hour(late),
            Utc.with_ymd_and_hms(2024, 7, 1, 13, 0, 0).unwrap()
        );

        let midnight_edge = Utc.with_ymd_and_hms(2024, 7, 1, 23, 45, 0).unwrap();
        assert_eq!(utc_day(truncate_to_hour(midnight_edge)), utc_day(midnight_edge));
    }

    #[test]
    fn test_epoch_days() {
        let day = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
        assert_eq!(days_since_epoch(day), 10);
        assert_eq!(from_days_since_epoch(10), Some(day));

        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(days_since_epoch(before), -1);
    }
}
