pub mod cache;
pub mod entry;
pub mod input;
pub mod splitter;
pub mod timestamp;

pub use cache::{CacheError, CacheStatus, LogCache};
pub use entry::{parse, EntryError, ParsedRecord};
pub use input::{read_log_file, read_raw_log, strip_leading, InputError, DEFAULT_STRIP_PREFIX};
pub use splitter::{split, LogEntry};
