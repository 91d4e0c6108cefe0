use super::CliError;
use crate::config::Config;
use crate::source::LogCache;

/// Drop every cached copy of the input log.
pub fn clear(config: &Config) -> Result<(), CliError> {
    let cache = LogCache::new(&config.cache.dir);
    let removed = cache.clear()?;
    println!(
        "Removed {} cache entr{} from {}",
        removed,
        if removed == 1 { "y" } else { "ies" },
        cache.dir().display()
    );
    Ok(())
}
