use super::{open_storage, CliError};
use crate::config::Config;
use crate::ingest::ConsoleProgress;
use crate::fetch::{
    fetch_blob_page, fetch_page, page_count, reassemble, reassemble_blob, write_bytes, write_lines,
    BlobPage, PageRequest, PageResult,
};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub page_number: Option<u64>,
    pub page_size: Option<u64>,
    pub count_only: bool,
}

fn page_request(config: &Config, options: &FetchOptions) -> Result<PageRequest, CliError> {
    Ok(PageRequest::new(
        options.page_number.unwrap_or(1),
        options.page_size.unwrap_or(config.fetch.page_size),
    )?)
}

/// Fetch one timestamp-ordered page of records and write it as text.
pub async fn run_fetch(config: &Config, options: FetchOptions) -> Result<(), CliError> {
    let started = Instant::now();
    let request = page_request(config, &options)?;
    let storage = open_storage(config).await?;

    let query_started = Instant::now();
    match fetch_page(&storage, request, options.count_only).await? {
        PageResult::Count(count) => {
            println!(
                "Total no of pages: {}, Documents count: {}",
                page_count(count, request.page_size()),
                count
            );
            println!(
                "Time taken to get the count of documents in seconds: {:.4}",
                query_started.elapsed().as_secs_f64()
            );
        }
        PageResult::Records(records) => {
            println!(
                "Page Number: {}, Page size: {}, Time: {:.4}",
                request.page_number(),
                request.page_size(),
                query_started.elapsed().as_secs_f64()
            );
            let lines = reassemble(&records);
            write_lines(&config.output.path, &lines)?;
            info!(output = %config.output.path.display(), lines = lines.len(), "Wrote logs");
        }
    }

    println!(
        "Total time taken to execute the program in seconds: {:.4}",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Fetch a page of blobs stored under `filename` and write their bytes.
pub async fn run_fetch_blob(
    config: &Config,
    filename: &str,
    options: FetchOptions,
) -> Result<(), CliError> {
    let started = Instant::now();
    let request = page_request(config, &options)?;
    let storage = open_storage(config).await?;

    let query_started = Instant::now();
    let page = fetch_blob_page(&storage, filename, request, options.count_only, |total| {
        ConsoleProgress::new("Fetch blobs", total)
    })
    .await?;
    match page {
        BlobPage::Count(count) => {
            println!("{}", count);
            return Ok(());
        }
        BlobPage::Fragments(fragments) => {
            println!(
                "Time taken to get data from blob store in seconds: {:.4}",
                query_started.elapsed().as_secs_f64()
            );
            let bytes = reassemble_blob(&fragments);
            write_bytes(&config.output.path, &bytes)?;
            info!(
                output = %config.output.path.display(),
                files = fragments.len(),
                bytes = bytes.len(),
                "Wrote blob content"
            );
        }
    }

    println!(
        "Total time taken to execute the program in seconds: {:.4}",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
