pub mod progress;
pub mod stats;

pub use progress::{ConsoleProgress, NoProgress, Progress};
pub use stats::InsertStats;

use crate::source::{self, EntryError};
use crate::storage::{generate_filename, BlobRecord, BlobStore, DocumentStore, StorageError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("parse error: {0}")]
    Parse(#[from] EntryError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub batch_id: Uuid,
    pub records: usize,
    pub insert_stats: Option<InsertStats>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct BlobIngestReport {
    pub file_id: Uuid,
    pub filename: String,
    pub bytes: usize,
    pub chunk_size: u64,
    pub elapsed: Duration,
}

/// Drives a raw log through split, parse and store, one record at a time.
pub struct Ingestor<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: DocumentStore + ?Sized> Ingestor<'_, S> {
    /// Split `blob` into entries and insert each as a record under a single
    /// batch id. Any parse or store failure aborts the run.
    ///
    /// `make_progress` receives the tick total (two per entry) once the
    /// entry count is known.
    pub async fn ingest<P, F>(&self, blob: &str, make_progress: F) -> Result<IngestReport, IngestError>
    where
        P: Progress,
        F: FnOnce(u64) -> P,
    {
        let started = Instant::now();
        let batch_id = Uuid::new_v4();
        let (count, entries) = source::split(blob);

        if count == 0 {
            info!("No timestamped entries found, nothing to ingest");
            return Ok(IngestReport {
                batch_id,
                records: 0,
                insert_stats: None,
                elapsed: started.elapsed(),
            });
        }

        info!(%batch_id, entries = count, "Ingesting log entries");
        let mut progress = make_progress(count as u64 * 2);
        let mut samples = Vec::with_capacity(count);

        for entry in entries {
            let record = source::parse(entry.raw_text, entry.timestamp, batch_id)?;
            progress.tick();

            let insert_started = Instant::now();
            self.store.insert_record(&record).await?;
            samples.push(insert_started.elapsed());
            progress.tick();

            debug!(record_id = %record.id, timestamp = %record.timestamp, "Stored record");
        }
        progress.finish();

        let insert_stats = InsertStats::from_samples(&samples);
        info!(%batch_id, records = count, "Ingestion complete");

        Ok(IngestReport {
            batch_id,
            records: count,
            insert_stats,
            elapsed: started.elapsed(),
        })
    }
}

impl<S: BlobStore + ?Sized> Ingestor<'_, S> {
    /// Store `blob` unparsed as one file. A random filename is generated when
    /// `filename` is `None`.
    pub async fn ingest_blob(
        &self,
        blob: &str,
        filename: Option<String>,
        chunk_size: u64,
    ) -> Result<BlobIngestReport, IngestError> {
        let filename = filename.unwrap_or_else(generate_filename);
        info!(filename = %filename, bytes = blob.len(), chunk_size, "Storing log as blob");

        let record = BlobRecord {
            filename,
            chunk_size,
            payload: blob.as_bytes().to_vec(),
        };

        let started = Instant::now();
        let file_id = self.store.put(&record).await?;
        let elapsed = started.elapsed();

        Ok(BlobIngestReport {
            file_id,
            filename: record.filename,
            bytes: record.payload.len(),
            chunk_size,
            elapsed,
        })
    }
}
