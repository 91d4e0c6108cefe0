use super::FetchError;
use crate::source::timestamp::format_timestamp;
use crate::source::ParsedRecord;
use std::fs;
use std::path::Path;

/// `"{timestamp} {process_id} {log_level} {module_name} {message}"`
pub fn format_record(record: &ParsedRecord) -> String {
    format!(
        "{} {} {} {} {}",
        format_timestamp(&record.timestamp),
        record.process_id,
        record.log_level,
        record.module_name,
        record.message
    )
}

pub fn reassemble(records: &[ParsedRecord]) -> Vec<String> {
    records.iter().map(format_record).collect()
}

/// Concatenate blob fragments in fetch order.
pub fn reassemble_blob(fragments: &[Vec<u8>]) -> Vec<u8> {
    fragments.concat()
}

/// Overwrite `path` with `lines` joined by newlines.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<(), FetchError> {
    write_bytes(path, lines.join("\n").as_bytes())
}

/// Overwrite `path` with `bytes`.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    fs::write(path, bytes).map_err(|source| FetchError::Output {
        path: path.display().to_string(),
        source,
    })
}
