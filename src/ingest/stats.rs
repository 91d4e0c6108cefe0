use std::time::Duration;

/// Summary of per-record insert latencies for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertStats {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub total: Duration,
}

impl InsertStats {
    /// `None` when nothing was inserted.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let total: Duration = samples.iter().sum();
        let count = samples.len();
        let mean = total / u32::try_from(count).unwrap_or(u32::MAX);

        Some(Self {
            count,
            min,
            max,
            mean,
            total,
        })
    }
}
