use super::blob::{BlobFile, BlobRecord};
use super::query::{AggregateOutput, Pipeline, QueryError};
use super::traits::{BlobStore, DocumentStore, StorageError};
use crate::source::ParsedRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const RECORDS_TABLE: &str = "log_records";

const SCHEMA: &[&str] = &[
    "CREATE SEQUENCE IF NOT EXISTS log_record_seq",
    "CREATE TABLE IF NOT EXISTS log_records (
        id UUID PRIMARY KEY,
        seq BIGINT NOT NULL DEFAULT nextval('log_record_seq'),
        batch_id UUID NOT NULL,
        timestamp TIMESTAMP NOT NULL,
        process_id VARCHAR NOT NULL,
        log_level VARCHAR NOT NULL,
        module_name VARCHAR NOT NULL,
        message VARCHAR NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_log_records_timestamp ON log_records(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_log_records_batch ON log_records(batch_id)",
    "CREATE SEQUENCE IF NOT EXISTS blob_file_seq",
    "CREATE TABLE IF NOT EXISTS blob_files (
        file_id UUID PRIMARY KEY,
        seq BIGINT NOT NULL DEFAULT nextval('blob_file_seq'),
        filename VARCHAR NOT NULL,
        length BIGINT NOT NULL,
        chunk_size BIGINT NOT NULL,
        upload_date TIMESTAMP NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_blob_files_filename ON blob_files(filename)",
    "CREATE TABLE IF NOT EXISTS blob_chunks (
        file_id UUID NOT NULL,
        n INTEGER NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY (file_id, n)
    )",
];

/// Extract PID from DuckDB lock error message, e.g. "... (PID 12345) ..."
fn extract_pid_from_lock_error(error_msg: &str) -> Option<u32> {
    let start = error_msg.find("(PID ")? + "(PID ".len();
    let end = error_msg[start..].find(')')?;
    error_msg[start..start + end].trim().parse().ok()
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
}

fn conversion_error(col: usize, ty: duckdb::types::Type, msg: &str) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(
        col,
        ty,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())),
    )
}

fn uuid_at(row: &duckdb::Row<'_>, col: usize) -> duckdb::Result<Uuid> {
    Uuid::parse_str(&row.get::<_, String>(col)?).map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(col, duckdb::types::Type::Text, Box::new(e))
    })
}

fn timestamp_at(row: &duckdb::Row<'_>, col: usize) -> duckdb::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(row.get::<_, i64>(col)?)
        .ok_or_else(|| conversion_error(col, duckdb::types::Type::BigInt, "invalid timestamp"))
}

/// Row layout must match `query::RECORD_COLUMNS`.
fn record_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<ParsedRecord> {
    Ok(ParsedRecord {
        id: uuid_at(row, 0)?,
        batch_id: uuid_at(row, 1)?,
        timestamp: timestamp_at(row, 2)?,
        process_id: row.get(3)?,
        log_level: row.get(4)?,
        module_name: row.get(5)?,
        message: row.get(6)?,
    })
}

/// Document and blob store backed by one DuckDB database.
pub struct DuckDbStorage {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStorage {
    /// Open (or create) the database file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();

        match Connection::open(path) {
            Ok(conn) => Ok(Self {
                conn: Arc::new(Mutex::new(conn)),
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("Could not set lock") {
                    tracing::warn!(path = %path.display(), "Database lock detected: {}", error_msg);
                    return Err(StorageError::Locked {
                        path: path.display().to_string(),
                        pid: extract_pid_from_lock_error(&error_msg),
                    });
                }
                Err(e.into())
            }
        }
    }

    /// Create an in-memory DuckDB storage instance (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            for statement in SCHEMA {
                conn.execute(statement, [])?;
            }
            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl DocumentStore for DuckDbStorage {
    async fn insert_record(&self, record: &ParsedRecord) -> Result<(), StorageError> {
        let conn = self.conn.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.execute(
                "INSERT INTO log_records (id, batch_id, timestamp, process_id, log_level, module_name, message)
                 VALUES (?, ?, make_timestamp(?), ?, ?, ?, ?)",
                duckdb::params![
                    record.id.to_string(),
                    record.batch_id.to_string(),
                    record.timestamp.timestamp_micros(),
                    record.process_id,
                    record.log_level,
                    record.module_name,
                    record.message,
                ],
            )?;
            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<AggregateOutput, StorageError> {
        let plan = pipeline.to_sql(RECORDS_TABLE)?;
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;

            if plan.counts {
                let count: i64 = conn.query_row(
                    &plan.sql,
                    duckdb::params_from_iter(plan.params.iter()),
                    |row| row.get(0),
                )?;
                return Ok(AggregateOutput::Count(count.max(0) as u64));
            }

            let mut stmt = conn.prepare(&plan.sql)?;
            let rows = stmt.query_map(duckdb::params_from_iter(plan.params.iter()), record_from_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(AggregateOutput::Records(records))
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl BlobStore for DuckDbStorage {
    async fn put(&self, blob: &BlobRecord) -> Result<Uuid, StorageError> {
        if blob.chunk_size == 0 {
            return Err(StorageError::ZeroChunkSize);
        }

        let conn = self.conn.clone();
        let blob = blob.clone();
        let file_id = Uuid::new_v4();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;

            let chunk_size = usize::try_from(blob.chunk_size).unwrap_or(usize::MAX);
            for (n, chunk) in blob.payload.chunks(chunk_size).enumerate() {
                tx.execute(
                    "INSERT INTO blob_chunks (file_id, n, data) VALUES (?, ?, ?)",
                    duckdb::params![file_id.to_string(), n as i64, chunk.to_vec()],
                )?;
            }

            tx.execute(
                "INSERT INTO blob_files (file_id, filename, length, chunk_size, upload_date)
                 VALUES (?, ?, ?, ?, make_timestamp(?))",
                duckdb::params![
                    file_id.to_string(),
                    blob.filename,
                    blob.payload.len() as i64,
                    blob.chunk_size as i64,
                    Utc::now().timestamp_micros(),
                ],
            )?;

            tx.commit()?;
            Ok::<Uuid, StorageError>(file_id)
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn find_files(
        &self,
        filename: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<BlobFile>, StorageError> {
        let conn = self.conn.clone();
        let filename = filename.to_string();
        let skip = i64::try_from(skip).map_err(|_| QueryError::WindowTooLarge(skip))?;
        let limit = i64::try_from(limit).map_err(|_| QueryError::WindowTooLarge(limit))?;

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT file_id::VARCHAR, filename, length, chunk_size, epoch_us(upload_date)
                 FROM blob_files
                 WHERE filename = ?
                 ORDER BY seq
                 LIMIT ? OFFSET ?",
            )?;

            let rows = stmt.query_map(
                duckdb::params![filename, limit, skip],
                |row| {
                    Ok(BlobFile {
                        file_id: uuid_at(row, 0)?,
                        filename: row.get(1)?,
                        length: row.get::<_, i64>(2)?.max(0) as u64,
                        chunk_size: row.get::<_, i64>(3)?.max(0) as u64,
                        upload_date: timestamp_at(row, 4)?,
                    })
                },
            )?;

            let mut files = Vec::new();
            for row in rows {
                files.push(row?);
            }
            Ok(files)
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn get(&self, file_id: Uuid) -> Result<Vec<u8>, StorageError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let id = file_id.to_string();

            let known: i64 = conn.query_row(
                "SELECT count(*) FROM blob_files WHERE file_id = ?",
                duckdb::params![id],
                |row| row.get(0),
            )?;
            if known == 0 {
                return Err(StorageError::FileNotFound(file_id));
            }

            let mut stmt =
                conn.prepare("SELECT data FROM blob_chunks WHERE file_id = ? ORDER BY n")?;
            let chunks = stmt.query_map(duckdb::params![id], |row| row.get::<_, Vec<u8>>(0))?;

            let mut data = Vec::new();
            for chunk in chunks {
                data.extend_from_slice(&chunk?);
            }
            Ok(data)
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn chunk_count(&self, filename: &str) -> Result<u64, StorageError> {
        let conn = self.conn.clone();
        let filename = filename.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let count: i64 = conn.query_row(
                "SELECT count(*) FROM blob_chunks c
                 JOIN blob_files f ON c.file_id = f.file_id
                 WHERE f.filename = ?",
                duckdb::params![filename],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn setup_storage() -> DuckDbStorage {
        let storage = DuckDbStorage::in_memory().unwrap();
        storage.init_schema().await.unwrap();
        storage
    }

    fn record(batch_id: Uuid, secs: i64, millis: u32, level: &str, message: &str) -> ParsedRecord {
        ParsedRecord {
            id: Uuid::new_v4(),
            batch_id,
            timestamp: Utc.timestamp_opt(secs, millis * 1_000_000).unwrap(),
            process_id: "8844".to_string(),
            log_level: level.to_string(),
            module_name: "rally.common.plugin.discover".to_string(),
            message: message.to_string(),
        }
    }

    fn sorted_by_time() -> Pipeline {
        Pipeline::new().sort_by_timestamp()
    }

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() {
        let storage = setup_storage().await;
        storage.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let storage = setup_storage().await;
        let original = record(Uuid::new_v4(), 1655318286, 437, "INFO", "line one\nline two");

        storage.insert_record(&original).await.unwrap();
        let output = storage.aggregate(&sorted_by_time()).await.unwrap();

        assert_eq!(output, AggregateOutput::Records(vec![original]));
    }

    #[tokio::test]
    async fn test_millisecond_precision_survives() {
        let storage = setup_storage().await;
        let original = record(Uuid::new_v4(), 1655318286, 437, "INFO", "x");

        storage.insert_record(&original).await.unwrap();
        let AggregateOutput::Records(records) = storage.aggregate(&sorted_by_time()).await.unwrap() else {
            panic!("expected records");
        };

        assert_eq!(records[0].timestamp.timestamp_subsec_millis(), 437);
    }

    #[tokio::test]
    async fn test_sort_skip_limit() {
        let storage = setup_storage().await;
        let batch = Uuid::new_v4();
        for secs in [5, 1, 4, 2, 3] {
            storage
                .insert_record(&record(batch, 1_700_000_000 + secs, 0, "INFO", &secs.to_string()))
                .await
                .unwrap();
        }

        let output = storage
            .aggregate(&sorted_by_time().skip(1).limit(2))
            .await
            .unwrap();

        let AggregateOutput::Records(records) = output else {
            panic!("expected records");
        };
        let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_count_empty_collection() {
        let storage = setup_storage().await;

        let output = storage.aggregate(&sorted_by_time().count()).await.unwrap();

        assert_eq!(output, AggregateOutput::Count(0));
    }

    #[tokio::test]
    async fn test_count_records() {
        let storage = setup_storage().await;
        let batch = Uuid::new_v4();
        for i in 0..3 {
            storage
                .insert_record(&record(batch, 1_700_000_000 + i, 0, "WARN", "m"))
                .await
                .unwrap();
        }

        let output = storage.aggregate(&sorted_by_time().count()).await.unwrap();

        assert_eq!(output, AggregateOutput::Count(3));
    }

    #[tokio::test]
    async fn test_invalid_pipeline_is_rejected() {
        let storage = setup_storage().await;

        let result = storage.aggregate(&Pipeline::new().count().skip(1)).await;

        assert!(matches!(result, Err(StorageError::Query(_))));
    }

    #[tokio::test]
    async fn test_blob_put_get_across_chunks() {
        let storage = setup_storage().await;
        let payload = b"0123456789abcdefghij".to_vec();

        let file_id = storage
            .put(&BlobRecord {
                filename: "abc1234".to_string(),
                chunk_size: 6,
                payload: payload.clone(),
            })
            .await
            .unwrap();

        assert_eq!(storage.get(file_id).await.unwrap(), payload);
        assert_eq!(storage.chunk_count("abc1234").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_find_files_by_name_in_upload_order() {
        let storage = setup_storage().await;
        let mut ids = Vec::new();
        for body in ["first", "second", "third"] {
            ids.push(
                storage
                    .put(&BlobRecord {
                        filename: "same".to_string(),
                        chunk_size: 1024,
                        payload: body.as_bytes().to_vec(),
                    })
                    .await
                    .unwrap(),
            );
        }
        storage
            .put(&BlobRecord {
                filename: "other".to_string(),
                chunk_size: 1024,
                payload: b"nope".to_vec(),
            })
            .await
            .unwrap();

        let files = storage.find_files("same", 1, 10).await.unwrap();

        let found: Vec<Uuid> = files.iter().map(|f| f.file_id).collect();
        assert_eq!(found, ids[1..].to_vec());
        assert_eq!(files[0].length, 6);
        assert_eq!(files[0].chunk_size, 1024);
    }

    #[tokio::test]
    async fn test_chunk_count_is_scoped_to_filename() {
        let storage = setup_storage().await;
        for (name, size) in [("a", 10usize), ("b", 25)] {
            storage
                .put(&BlobRecord {
                    filename: name.to_string(),
                    chunk_size: 10,
                    payload: vec![7u8; size],
                })
                .await
                .unwrap();
        }

        assert_eq!(storage.chunk_count("a").await.unwrap(), 1);
        assert_eq!(storage.chunk_count("b").await.unwrap(), 3);
        assert_eq!(storage.chunk_count("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_files_rejects_oversized_window() {
        let storage = setup_storage().await;

        let result = storage.find_files("any", u64::MAX, 10).await;

        assert!(matches!(
            result,
            Err(StorageError::Query(QueryError::WindowTooLarge(u64::MAX)))
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_file() {
        let storage = setup_storage().await;
        let id = Uuid::new_v4();

        let result = storage.get(id).await;

        assert!(matches!(result, Err(StorageError::FileNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let storage = setup_storage().await;

        let result = storage
            .put(&BlobRecord {
                filename: "z".to_string(),
                chunk_size: 0,
                payload: b"x".to_vec(),
            })
            .await;

        assert!(matches!(result, Err(StorageError::ZeroChunkSize)));
    }

    #[test]
    fn test_extract_pid_from_lock_error() {
        let msg = "IO Error: Could not set lock on file \"x.duckdb\": Conflicting lock is held in /usr/bin/logdepot (PID 12345) by user me";

        assert_eq!(extract_pid_from_lock_error(msg), Some(12345));
        assert_eq!(extract_pid_from_lock_error("no pid here"), None);
    }
}
