pub mod parse;
pub mod types;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_config, parse_config, ConfigError};
pub use types::Config;

/// Commented sample written by `logdepot config init`.
pub const SAMPLE_CONFIG: &str = include_str!("../../samples/sample-config.yml");

/// Matches $env{VAR_NAME} where VAR_NAME starts with a letter or underscore.
pub(crate) static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap()
});

/// Replace every `$env{VAR}` with the variable's value. Unset variables stay
/// as written so [`parse_config`] can report them by name.
pub fn expand_env_vars(text: &str) -> String {
    ENV_VAR_REGEX
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expand `~` or a leading `~/` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let rest = match path.strip_prefix("~") {
        Ok(rest) => rest,
        Err(_) => return path.to_path_buf(),
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Where the config comes from: `--config` if given, otherwise the first of
/// `~/.config/logdepot/config.yml` and `/etc/logdepot/config.yml` that exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    let user_config = dirs::home_dir().map(|home| home.join(".config/logdepot/config.yml"));
    user_config
        .into_iter()
        .chain(std::iter::once(PathBuf::from("/etc/logdepot/config.yml")))
        .find(|candidate| candidate.exists())
}

/// Load the resolved config file, or fall back to built-in defaults when
/// none exists.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match resolve_config_path(explicit) {
        Some(path) => {
            tracing::info!(config_path = %path.display(), "Loading configuration");
            load_config(&path)
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
