use super::input::InputError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, info, warn};

const CACHE_FILE_PREFIX: &str = "log-";
const CACHE_FILE_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Input(#[from] InputError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedLog {
    source: PathBuf,
    log: String,
}

/// On-disk cache of raw log text, keyed by the source file's identity.
///
/// The key hashes the canonical path, modification time and length of the
/// source, so editing or replacing the source file misses the cache.
#[derive(Debug, Clone)]
pub struct LogCache {
    dir: PathBuf,
}

impl LogCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the cached text for `source`, or call `read` and cache its result.
    pub fn load<F>(&self, source: &Path, read: F) -> Result<(String, CacheStatus), CacheError>
    where
        F: FnOnce(&Path) -> Result<String, InputError>,
    {
        let cache_path = self.entry_path(source)?;

        if cache_path.exists() {
            match self.read_entry(&cache_path) {
                Ok(cached) => {
                    info!(cache = %cache_path.display(), "Loaded log from cache");
                    return Ok((cached.log, CacheStatus::Hit));
                }
                Err(e) => {
                    warn!(cache = %cache_path.display(), error = %e, "Ignoring unreadable cache entry");
                }
            }
        }

        let log = read(source)?;

        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        let entry = CachedLog {
            source: source.to_path_buf(),
            log,
        };
        let serialized = serde_json::to_vec(&entry)?;
        fs::write(&cache_path, serialized).map_err(|source| CacheError::Io {
            path: cache_path.display().to_string(),
            source,
        })?;
        info!(cache = %cache_path.display(), "Cached log read from source");

        Ok((entry.log, CacheStatus::Miss))
    }

    /// Remove every cache entry. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| CacheError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let name = dir_entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(CACHE_FILE_PREFIX) && name.ends_with(CACHE_FILE_SUFFIX) {
                let path = dir_entry.path();
                fs::remove_file(&path).map_err(|source| CacheError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                debug!(cache = %path.display(), "Removed cache entry");
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn entry_path(&self, source: &Path) -> Result<PathBuf, CacheError> {
        let key = cache_key(source)?;
        Ok(self
            .dir
            .join(format!("{CACHE_FILE_PREFIX}{key}{CACHE_FILE_SUFFIX}")))
    }

    fn read_entry(&self, path: &Path) -> Result<CachedLog, CacheError> {
        let bytes = fs::read(path).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Hex SHA-256 over the source's canonical path, mtime and length.
fn cache_key(source: &Path) -> Result<String, CacheError> {
    let io_err = |e: std::io::Error| {
        CacheError::Input(InputError::Io {
            path: source.display().to_string(),
            source: e,
        })
    };

    let canonical = source.canonicalize().map_err(io_err)?;
    let metadata = fs::metadata(&canonical).map_err(io_err)?;
    let mtime_nanos = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(mtime_nanos.to_le_bytes());
    hasher.update(metadata.len().to_le_bytes());

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
