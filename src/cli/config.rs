use super::CliError;
use crate::config::{load_config, SAMPLE_CONFIG};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

/// Write the sample config to `~/.config/logdepot/config.yml`, or print it.
pub fn init(stdout: bool) -> Result<(), CliError> {
    if stdout {
        print!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/logdepot/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/logdepot/config.yml"));

    write_sample(&config_path)?;
    println!("Config file written to {}", config_path.display());
    Ok(())
}

fn write_sample(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        return Err(Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "config file already exists at {}; remove it first or use --stdout",
                path.display()
            ),
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, SAMPLE_CONFIG)?;
    Ok(())
}

/// Load a config file and report whether it is valid.
pub fn validate(path: &Path) -> Result<(), CliError> {
    println!("Validating config file: {}", path.display());
    load_config(path)?;
    println!("Config is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_sample_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/config.yml");

        write_sample(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_CONFIG);
    }

    #[test]
    fn test_write_sample_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "mine").unwrap();

        let result = write_sample(&path);

        assert!(matches!(result, Err(CliError::Io(e)) if e.kind() == ErrorKind::AlreadyExists));
        assert_eq!(fs::read_to_string(&path).unwrap(), "mine");
    }

    #[test]
    fn test_validate_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        write_sample(&path).unwrap();

        assert!(validate(&path).is_ok());
    }
}
