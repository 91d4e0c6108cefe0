use super::blob::{BlobFile, BlobRecord};
use super::query::{AggregateOutput, Pipeline, QueryError};
use crate::source::ParsedRecord;
use async_trait::async_trait;
use uuid::Uuid;

/// Record-at-a-time store for parsed log records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_record(&self, record: &ParsedRecord) -> Result<(), StorageError>;

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<AggregateOutput, StorageError>;
}

/// Chunked binary store addressed by filename and store-assigned id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, blob: &BlobRecord) -> Result<Uuid, StorageError>;

    /// Metadata of files named `filename`, in upload order.
    async fn find_files(
        &self,
        filename: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<BlobFile>, StorageError>;

    async fn get(&self, file_id: Uuid) -> Result<Vec<u8>, StorageError>;

    /// Number of chunks stored for files named `filename`.
    async fn chunk_count(&self, filename: &str) -> Result<u64, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("database '{path}' is locked by another process{}", .pid.map(|p| format!(" (PID {p})")).unwrap_or_default())]
    Locked { path: String, pid: Option<u32> },

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("blob file not found: {0}")]
    FileNotFound(Uuid),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

impl From<duckdb::Error> for StorageError {
    fn from(e: duckdb::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}
