use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Pattern of the timestamp that opens every log entry, e.g. `2022-06-15 18:38:06.437`.
pub const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}";

/// strptime form of [`TIMESTAMP_PATTERN`], millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub(crate) static TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(TIMESTAMP_PATTERN).unwrap());

#[derive(Debug, Error)]
#[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
pub struct TimestampError {
    pub value: String,
    pub format: &'static str,
    #[source]
    pub source: chrono::ParseError,
}

/// Parse an entry timestamp. The log carries no zone, so it is taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|source| TimestampError {
            value: value.to_string(),
            format: TIMESTAMP_FORMAT,
            source,
        })
}

/// Render a timestamp the way it appeared in the source log.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millis() {
        let ts = parse_timestamp("2022-06-15 18:38:06.437").unwrap();

        assert_eq!(ts.to_rfc3339(), "2022-06-15T18:38:06.437+00:00");
        assert_eq!(ts.timestamp_subsec_millis(), 437);
    }

    #[test]
    fn test_format_roundtrips_source_text() {
        let ts = parse_timestamp("2022-06-15 18:38:07.000").unwrap();

        assert_eq!(format_timestamp(&ts), "2022-06-15 18:38:07.000");
    }

    #[test]
    fn test_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();

        assert_eq!(err.value, "yesterday");
        assert!(err.to_string().contains(TIMESTAMP_FORMAT));
    }

    #[test]
    fn test_pattern_finds_embedded_timestamp() {
        let found = TIMESTAMP_REGEX
            .find("header 2022-06-15 18:38:06.437 8844 INFO x")
            .map(|m| m.as_str());

        assert_eq!(found, Some("2022-06-15 18:38:06.437"));
    }
}
