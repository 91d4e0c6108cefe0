use super::timestamp::{parse_timestamp, TimestampError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// `<pid> <LEVEL> <dotted.module> <message...>`; the message may span lines.
static ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)([0-9]+) ([A-Z]+) ([A-Za-z0-9.]+) (.*)").unwrap()
});

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry at {timestamp} does not match '<pid> <LEVEL> <module> <message>': {text:?}")]
    GrammarMismatch { timestamp: String, text: String },

    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// A log entry broken into its fields, as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub process_id: String,
    pub log_level: String,
    pub module_name: String,
    pub message: String,
}

/// Parse one entry produced by the splitter.
///
/// `entry_text` is the text that followed `timestamp` in the source. A fresh
/// record id is generated on every call; `batch_id` is shared by the run.
pub fn parse(entry_text: &str, timestamp: &str, batch_id: Uuid) -> Result<ParsedRecord, EntryError> {
    let timestamp_value = parse_timestamp(timestamp)?;

    let captures = ENTRY_REGEX
        .captures(entry_text)
        .ok_or_else(|| EntryError::GrammarMismatch {
            timestamp: timestamp.to_string(),
            text: entry_text.to_string(),
        })?;

    let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

    // The line break before the next timestamp belongs to the separator.
    let message = group(4);
    let message = message
        .strip_suffix('\n')
        .map(|m| m.strip_suffix('\r').unwrap_or(m))
        .unwrap_or(message);

    Ok(ParsedRecord {
        id: Uuid::new_v4(),
        batch_id,
        timestamp: timestamp_value,
        process_id: group(1).to_string(),
        log_level: group(2).to_string(),
        module_name: group(3).to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rally_entry() {
        let batch_id = Uuid::new_v4();
        let record = parse(
            " 8844 INFO rally.common.plugin.discover [-] Loading plugins\n",
            "2022-06-15 18:38:06.437",
            batch_id,
        )
        .unwrap();

        assert_eq!(record.batch_id, batch_id);
        assert_eq!(record.timestamp.to_rfc3339(), "2022-06-15T18:38:06.437+00:00");
        assert_eq!(record.process_id, "8844");
        assert_eq!(record.log_level, "INFO");
        assert_eq!(record.module_name, "rally.common.plugin.discover");
        assert_eq!(record.message, "[-] Loading plugins");
    }

    #[test]
    fn test_multiline_message_is_preserved() {
        let record = parse(
            " 12 ERROR touchstone.runner Traceback (most recent call last):\n  File \"a.py\", line 3\n    raise X\n",
            "2022-06-15 18:38:06.437",
            Uuid::new_v4(),
        )
        .unwrap();

        assert_eq!(
            record.message,
            "Traceback (most recent call last):\n  File \"a.py\", line 3\n    raise X"
        );
    }

    #[test]
    fn test_empty_message() {
        let record = parse(" 1 DEBUG a.b ", "2022-06-15 18:38:06.437", Uuid::new_v4()).unwrap();

        assert_eq!(record.module_name, "a.b");
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_crlf_terminator_is_trimmed() {
        let record = parse(" 1 INFO a.b hello\r\n", "2022-06-15 18:38:06.437", Uuid::new_v4()).unwrap();

        assert_eq!(record.message, "hello");
    }

    #[test]
    fn test_only_one_trailing_newline_is_trimmed() {
        let record = parse(" 1 INFO a.b hello\n\n", "2022-06-15 18:38:06.437", Uuid::new_v4()).unwrap();

        assert_eq!(record.message, "hello\n");
    }

    #[test]
    fn test_record_ids_are_unique() {
        let batch_id = Uuid::new_v4();
        let a = parse(" 1 INFO a.b x", "2022-06-15 18:38:06.437", batch_id).unwrap();
        let b = parse(" 1 INFO a.b x", "2022-06-15 18:38:06.437", batch_id).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.batch_id, b.batch_id);
    }

    #[test]
    fn test_grammar_mismatch_is_error() {
        let result = parse(" missing fields here", "2022-06-15 18:38:06.437", Uuid::new_v4());

        assert!(matches!(result, Err(EntryError::GrammarMismatch { .. })));
    }

    #[test]
    fn test_lowercase_level_is_mismatch() {
        let result = parse(" 8844 info rally.x msg", "2022-06-15 18:38:06.437", Uuid::new_v4());

        assert!(matches!(result, Err(EntryError::GrammarMismatch { .. })));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let result = parse(" 1 INFO a.b x", "2022-13-45 99:99:99.999", Uuid::new_v4());

        assert!(matches!(result, Err(EntryError::Timestamp(_))));
    }
}
