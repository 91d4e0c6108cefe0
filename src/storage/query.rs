use crate::source::ParsedRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("pipeline may contain at most one sort stage")]
    DuplicateSort,

    #[error("sort stage must come before skip and limit")]
    SortAfterWindow,

    #[error("count stage must be the last stage")]
    CountNotLast,

    #[error("window bound {0} does not fit a 64-bit signed integer")]
    WindowTooLarge(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Order records by timestamp, oldest first.
    SortByTimestamp,
    /// Collapse the stream into a single total.
    Count,
    Skip(u64),
    Limit(u64),
}

/// Ordered list of stages run against the record collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutput {
    Records(Vec<ParsedRecord>),
    Count(u64),
}

/// SQL produced for a pipeline, with its LIMIT/OFFSET values as bind
/// parameters in placeholder order. `counts` says whether it yields one
/// count row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPlan {
    pub sql: String,
    pub params: Vec<i64>,
    pub counts: bool,
}

pub(crate) const RECORD_COLUMNS: &str =
    "id::VARCHAR, batch_id::VARCHAR, epoch_us(timestamp), process_id, log_level, module_name, message";

fn bound(n: u64) -> Result<i64, QueryError> {
    i64::try_from(n).map_err(|_| QueryError::WindowTooLarge(n))
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by_timestamp(mut self) -> Self {
        self.stages.push(Stage::SortByTimestamp);
        self
    }

    pub fn count(mut self) -> Self {
        self.stages.push(Stage::Count);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.stages.push(Stage::Skip(n));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Translate the pipeline into a single SELECT over `table`.
    ///
    /// Consecutive skip and limit stages are folded into one window, so
    /// `skip(2).limit(5).skip(1)` reads rows 3..7 like a document store would.
    /// Ties in the sort key fall back to insertion order.
    pub fn to_sql(&self, table: &str) -> Result<SqlPlan, QueryError> {
        let mut sorted = false;
        let mut offset: u64 = 0;
        let mut limit: Option<u64> = None;
        let mut counts = false;
        let mut windowed = false;

        for (i, stage) in self.stages.iter().enumerate() {
            if counts {
                return Err(QueryError::CountNotLast);
            }
            match *stage {
                Stage::SortByTimestamp => {
                    if sorted {
                        return Err(QueryError::DuplicateSort);
                    }
                    if windowed {
                        return Err(QueryError::SortAfterWindow);
                    }
                    sorted = true;
                }
                Stage::Skip(n) => {
                    windowed = true;
                    offset = offset.saturating_add(n);
                    limit = limit.map(|l| l.saturating_sub(n));
                }
                Stage::Limit(n) => {
                    windowed = true;
                    limit = Some(limit.map_or(n, |l| l.min(n)));
                }
                Stage::Count => {
                    counts = true;
                    if i + 1 != self.stages.len() {
                        return Err(QueryError::CountNotLast);
                    }
                }
            }
        }

        let mut params = Vec::new();
        let mut select = format!("SELECT {RECORD_COLUMNS} FROM {table}");
        if sorted {
            select.push_str(" ORDER BY timestamp ASC, seq ASC");
        } else {
            select.push_str(" ORDER BY seq ASC");
        }
        if let Some(limit) = limit {
            select.push_str(" LIMIT ?");
            params.push(bound(limit)?);
        }
        if offset > 0 {
            select.push_str(" OFFSET ?");
            params.push(bound(offset)?);
        }

        let sql = if counts {
            format!("SELECT count(*) FROM ({select}) AS windowed")
        } else {
            select
        };

        Ok(SqlPlan {
            sql,
            params,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_pipeline_sql() {
        let plan = Pipeline::new()
            .sort_by_timestamp()
            .skip(20)
            .limit(10)
            .to_sql("log_records")
            .unwrap();

        assert!(!plan.counts);
        assert!(plan
            .sql
            .ends_with("FROM log_records ORDER BY timestamp ASC, seq ASC LIMIT ? OFFSET ?"));
        assert_eq!(plan.params, vec![10, 20]);
    }

    #[test]
    fn test_count_pipeline_sql() {
        let plan = Pipeline::new()
            .sort_by_timestamp()
            .count()
            .to_sql("log_records")
            .unwrap();

        assert!(plan.counts);
        assert!(plan.sql.starts_with("SELECT count(*) FROM (SELECT "));
        assert!(plan.params.is_empty());
    }

    #[test]
    fn test_skip_after_limit_shrinks_window() {
        let plan = Pipeline::new()
            .skip(2)
            .limit(5)
            .skip(1)
            .to_sql("t")
            .unwrap();

        assert!(plan.sql.ends_with("ORDER BY seq ASC LIMIT ? OFFSET ?"));
        assert_eq!(plan.params, vec![4, 3]);
    }

    #[test]
    fn test_oversized_window_rejected() {
        let result = Pipeline::new()
            .sort_by_timestamp()
            .skip(u64::MAX)
            .limit(10)
            .to_sql("t");

        assert_eq!(result, Err(QueryError::WindowTooLarge(u64::MAX)));
    }

    #[test]
    fn test_count_must_be_last() {
        let result = Pipeline::new().count().limit(1).to_sql("t");

        assert_eq!(result, Err(QueryError::CountNotLast));
    }

    #[test]
    fn test_sort_after_skip_rejected() {
        let result = Pipeline::new().skip(1).sort_by_timestamp().to_sql("t");

        assert_eq!(result, Err(QueryError::SortAfterWindow));
    }

    #[test]
    fn test_duplicate_sort_rejected() {
        let result = Pipeline::new()
            .sort_by_timestamp()
            .sort_by_timestamp()
            .to_sql("t");

        assert_eq!(result, Err(QueryError::DuplicateSort));
    }
}
