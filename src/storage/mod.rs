pub mod blob;
pub mod duckdb;
pub mod query;
pub mod traits;

pub use blob::{generate_filename, BlobFile, BlobRecord, DEFAULT_CHUNK_SIZE};
pub use query::{AggregateOutput, Pipeline, QueryError, Stage};
pub use traits::{BlobStore, DocumentStore, StorageError};
