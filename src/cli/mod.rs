pub mod cache;
pub mod config;
pub mod fetch;
pub mod ingest;

use crate::config::{Config, ConfigError};
use crate::fetch::FetchError;
use crate::ingest::IngestError;
use crate::source::{CacheError, InputError};
use crate::storage::duckdb::DuckDbStorage;
use crate::storage::StorageError;
use thiserror::Error;
use tracing::info;

/// Every way a command can fail. All of them end the process with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) async fn open_storage(config: &Config) -> Result<DuckDbStorage, CliError> {
    info!(path = %config.storage.path.display(), "Opening storage");
    let storage = DuckDbStorage::new(&config.storage.path)?;
    storage.init_schema().await?;
    Ok(storage)
}
