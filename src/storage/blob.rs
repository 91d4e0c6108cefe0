use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default bytes per stored chunk, just under 16 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 16_777_154;

const FILENAME_LEN: usize = 7;
const FILENAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A payload handed to the blob store. The store decides how it is chunked.
#[derive(Debug, Clone)]
pub struct BlobRecord {
    pub filename: String,
    pub chunk_size: u64,
    pub payload: Vec<u8>,
}

/// Metadata of a stored blob, as returned by a filename lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobFile {
    pub file_id: Uuid,
    pub filename: String,
    pub length: u64,
    pub chunk_size: u64,
    pub upload_date: DateTime<Utc>,
}

impl BlobFile {
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size)
    }
}

/// Random 7-character `[a-z0-9]` name for a blob stored without one.
pub fn generate_filename() -> String {
    let mut rng = rand::thread_rng();
    (0..FILENAME_LEN)
        .map(|_| FILENAME_ALPHABET[rng.gen_range(0..FILENAME_ALPHABET.len())] as char)
        .collect()
}
