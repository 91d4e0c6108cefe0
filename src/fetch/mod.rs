pub mod reassemble;

pub use reassemble::{format_record, reassemble, reassemble_blob, write_bytes, write_lines};

use crate::ingest::Progress;
use crate::source::ParsedRecord;
use crate::storage::{AggregateOutput, BlobStore, DocumentStore, Pipeline, StorageError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid page request: {0}")]
    InvalidPage(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to write output file '{path}': {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u64,
    page_size: u64,
}

impl PageRequest {
    pub fn new(page_number: u64, page_size: u64) -> Result<Self, FetchError> {
        if page_number == 0 {
            return Err(FetchError::InvalidPage(
                "page number must be 1 or greater".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(FetchError::InvalidPage(
                "page size must be greater than zero".to_string(),
            ));
        }
        let fits = (page_number - 1)
            .checked_mul(page_size)
            .and_then(|skip| skip.checked_add(page_size))
            .is_some_and(|end| i64::try_from(end).is_ok());
        if !fits {
            return Err(FetchError::InvalidPage(format!(
                "page {page_number} of size {page_size} is beyond the largest addressable record"
            )));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn skip(&self) -> u64 {
        (self.page_number - 1) * self.page_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    Records(Vec<ParsedRecord>),
    Count(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobPage {
    Fragments(Vec<Vec<u8>>),
    Count(u64),
}

/// Number of pages needed to show `total` items `page_size` at a time.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Pipeline for one page of records ordered by timestamp, or for the total
/// count when `count_only` is set.
pub fn page_pipeline(request: PageRequest, count_only: bool) -> Pipeline {
    let pipeline = Pipeline::new().sort_by_timestamp();
    if count_only {
        pipeline.count()
    } else {
        pipeline.skip(request.skip()).limit(request.page_size())
    }
}

pub async fn fetch_page<S: DocumentStore + ?Sized>(
    store: &S,
    request: PageRequest,
    count_only: bool,
) -> Result<PageResult, FetchError> {
    let pipeline = page_pipeline(request, count_only);
    debug!(stages = ?pipeline.stages(), "Running aggregation");

    let result = match store.aggregate(&pipeline).await? {
        AggregateOutput::Records(records) => {
            info!(
                page = request.page_number(),
                page_size = request.page_size(),
                records = records.len(),
                "Fetched page"
            );
            PageResult::Records(records)
        }
        AggregateOutput::Count(count) => PageResult::Count(count),
    };
    Ok(result)
}

/// Page over the stored files named `filename` and fetch each one's content.
///
/// With `count_only` the result is the number of chunks stored under
/// `filename`, not a store-wide total. `make_progress` receives the number of
/// files on the page and is ticked once per file read.
pub async fn fetch_blob_page<S, P, F>(
    store: &S,
    filename: &str,
    request: PageRequest,
    count_only: bool,
    make_progress: F,
) -> Result<BlobPage, FetchError>
where
    S: BlobStore + ?Sized,
    P: Progress,
    F: FnOnce(u64) -> P,
{
    if count_only {
        let count = store.chunk_count(filename).await?;
        return Ok(BlobPage::Count(count));
    }

    info!(filename = %filename, "Fetching blobs");
    let files = store
        .find_files(filename, request.skip(), request.page_size())
        .await?;

    let mut progress = make_progress(files.len() as u64);
    let mut fragments = Vec::with_capacity(files.len());
    for file in &files {
        debug!(file_id = %file.file_id, length = file.length, "Reading blob");
        fragments.push(store.get(file.file_id).await?);
        progress.tick();
    }
    progress.finish();

    Ok(BlobPage::Fragments(fragments))
}
