use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, ENV_VAR_REGEX};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Read and parse the YAML config at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read config '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml)
}

/// Parse and validate config YAML. Comments are dropped and environment
/// variables expanded first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(&strip_comments(yaml));
    check_unexpanded_vars(&yaml)?;

    // An empty document means "all defaults".
    let mut config: Config = if yaml.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml)?
    };

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn strip_comments(yaml: &str) -> String {
    yaml.lines().map(without_comment).collect::<Vec<_>>().join("\n")
}

/// Cut a `#` comment that starts the line or follows whitespace, outside quotes.
fn without_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut after_blank = true;

    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && after_blank => return &line[..i],
            None => {}
        }
        after_blank = c.is_whitespace();
    }

    line
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = ENV_VAR_REGEX
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

fn expand_paths(config: &mut Config) {
    config.storage.path = expand_tilde(&config.storage.path);
    config.input.path = expand_tilde(&config.input.path);
    config.cache.dir = expand_tilde(&config.cache.dir);
    config.output.path = expand_tilde(&config.output.path);
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.storage.path.as_os_str().is_empty() {
        errors.push("storage.path cannot be empty".to_string());
    }
    if config.blob.chunk_size == 0 {
        errors.push("blob.chunk_size must be greater than zero".to_string());
    }
    if config.fetch.page_size == 0 {
        errors.push("fetch.page_size must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
