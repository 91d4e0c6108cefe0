use super::{open_storage, CliError};
use crate::config::Config;
use crate::ingest::{ConsoleProgress, Ingestor, NoProgress, Progress};
use crate::source::{read_log_file, read_raw_log, strip_leading, CacheStatus, LogCache};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub input: Option<PathBuf>,
    pub no_cache: bool,
    pub no_progress: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BlobIngestOptions {
    pub input: Option<PathBuf>,
    pub filename: Option<String>,
    pub chunk_size: Option<u64>,
    pub no_cache: bool,
}

/// Read the log with the configured prefix stripped, through the cache unless
/// it is disabled. The cache holds the log as stored in the input file.
pub fn load_source(config: &Config, input: Option<&Path>, no_cache: bool) -> Result<String, CliError> {
    let path = input.unwrap_or(config.input.path.as_path());
    let strip_prefix = config.input.strip_prefix.as_str();

    if no_cache || !config.cache.enabled {
        info!(input = %path.display(), "Reading log file");
        return Ok(read_log_file(path, strip_prefix)?);
    }

    let cache = LogCache::new(&config.cache.dir);
    let (log, status) = cache.load(path, read_raw_log)?;
    match status {
        CacheStatus::Hit => info!(input = %path.display(), "Using cached log"),
        CacheStatus::Miss => info!(input = %path.display(), "Read log file and cached it"),
    }
    Ok(strip_leading(log, strip_prefix))
}

/// Split, parse and store every entry of the input log.
pub async fn run_ingest(config: &Config, options: IngestOptions) -> Result<(), CliError> {
    let started = Instant::now();
    let storage = open_storage(config).await?;
    let log = load_source(config, options.input.as_deref(), options.no_cache)?;

    let no_progress = options.no_progress;
    let report = Ingestor::new(&storage)
        .ingest(&log, |total| -> Box<dyn Progress> {
            if no_progress {
                Box::new(NoProgress)
            } else {
                Box::new(ConsoleProgress::new("Store logs", total))
            }
        })
        .await?;

    println!("Batch id: {}, Records stored: {}", report.batch_id, report.records);
    if let Some(stats) = report.insert_stats {
        println!(
            "Maximum time taken by slowest insert in seconds: {:.4}",
            stats.max.as_secs_f64()
        );
        println!(
            "Minimum time taken by fastest insert in seconds: {:.4}",
            stats.min.as_secs_f64()
        );
        println!(
            "Average time taken to store a record in seconds: {:.4}",
            stats.mean.as_secs_f64()
        );
        println!(
            "Total time taken to store records in seconds: {:.4}",
            stats.total.as_secs_f64()
        );
    }
    println!(
        "Total time taken to execute the program in seconds: {:.4}",
        started.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Store the input log unparsed as one chunked blob.
pub async fn run_ingest_blob(config: &Config, options: BlobIngestOptions) -> Result<(), CliError> {
    let started = Instant::now();
    let storage = open_storage(config).await?;
    let log = load_source(config, options.input.as_deref(), options.no_cache)?;
    let chunk_size = options.chunk_size.unwrap_or(config.blob.chunk_size);

    let report = Ingestor::new(&storage)
        .ingest_blob(&log, options.filename, chunk_size)
        .await?;

    println!("Stored blob with filename: {:?}", report.filename);
    println!(
        "Time taken to store data as blob in seconds: {:.4}",
        report.elapsed.as_secs_f64()
    );
    println!(
        "Total time taken to execute the program in seconds: {:.4}",
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
