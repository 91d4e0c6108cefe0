pub mod cli;
pub mod config;
pub mod fetch;
pub mod ingest;
pub mod source;
pub mod storage;
