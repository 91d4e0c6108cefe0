use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Diagnostic prefix the task runner prepends to a failed run's log.
pub const DEFAULT_STRIP_PREFIX: &str = "Command failed with error code 2 and error: ";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse input file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct InputDocument {
    log: String,
}

/// Read the `log` field of a JSON report and strip `strip_prefix` from the
/// very start of it.
pub fn read_log_file(path: &Path, strip_prefix: &str) -> Result<String, InputError> {
    read_raw_log(path).map(|log| strip_leading(log, strip_prefix))
}

/// Read the `log` field of a JSON report as stored.
pub fn read_raw_log(path: &Path) -> Result<String, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let document: InputDocument =
        serde_json::from_str(&content).map_err(|source| InputError::Json {
            path: path.display().to_string(),
            source,
        })?;

    Ok(document.log)
}

/// Remove `prefix` from the start of `log`, if it is there.
pub fn strip_leading(log: String, prefix: &str) -> String {
    if prefix.is_empty() {
        return log;
    }
    match log.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => log,
    }
}
