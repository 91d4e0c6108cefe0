use clap::{Parser, Subcommand};
use logdepot::cli::fetch::FetchOptions;
use logdepot::cli::ingest::{BlobIngestOptions, IngestOptions};
use logdepot::cli::CliError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logdepot")]
#[command(about = "Parse structured logs into a document store and page them back out", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split and parse the input log, storing one record per entry
    Ingest {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Read the input file even if a cached copy exists
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        no_progress: bool,
    },
    /// Store the input log unparsed as a single chunked blob
    IngestBlob {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Defaults to a random 7-character name
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        chunk_size: Option<u64>,
        #[arg(long)]
        no_cache: bool,
    },
    /// Write one page of records, ordered by timestamp, to the output file
    Fetch {
        page: Option<u64>,
        size: Option<u64>,
        /// Any value switches to printing the document and page counts
        #[arg(value_name = "COUNT")]
        count: Option<String>,
    },
    /// Write one page of blobs stored under FILENAME to the output file
    FetchBlob {
        filename: String,
        page: Option<u64>,
        size: Option<u64>,
        /// Print the number of chunks stored under FILENAME instead
        #[arg(long)]
        count: bool,
    },
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached copy of the input log
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logdepot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config;
    let load_config = || logdepot::config::load_or_default(config_path.as_deref());

    match cli.command {
        Commands::Ingest {
            input,
            no_cache,
            no_progress,
        } => {
            let options = IngestOptions {
                input,
                no_cache,
                no_progress,
            };
            logdepot::cli::ingest::run_ingest(&load_config()?, options).await
        }
        Commands::IngestBlob {
            input,
            filename,
            chunk_size,
            no_cache,
        } => {
            let options = BlobIngestOptions {
                input,
                filename,
                chunk_size,
                no_cache,
            };
            logdepot::cli::ingest::run_ingest_blob(&load_config()?, options).await
        }
        Commands::Fetch { page, size, count } => {
            let options = FetchOptions {
                page_number: page,
                page_size: size,
                count_only: count.is_some(),
            };
            logdepot::cli::fetch::run_fetch(&load_config()?, options).await
        }
        Commands::FetchBlob {
            filename,
            page,
            size,
            count,
        } => {
            let options = FetchOptions {
                page_number: page,
                page_size: size,
                count_only: count,
            };
            logdepot::cli::fetch::run_fetch_blob(&load_config()?, &filename, options).await
        }
        Commands::Cache {
            action: CacheAction::Clear,
        } => logdepot::cli::cache::clear(&load_config()?),
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => logdepot::cli::config::init(stdout),
            ConfigAction::Validate => {
                let path = logdepot::config::resolve_config_path(config_path.as_deref())
                    .ok_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no config file found; use --config to specify a path",
                        )
                    })?;
                logdepot::cli::config::validate(&path)
            }
        },
    }
}
