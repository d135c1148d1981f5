//! Progress Sink Trait
//!
//! Bulk runs report after every row. The runner only knows this trait, so
//! the same run can drive a terminal progress line, a log, or a test probe.

use async_trait::async_trait;
use serde::Serialize;

use crate::bulk::BulkResult;

/// Progress after one processed row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkProgress {
    pub completed: usize,
    pub total: usize,
    /// Outcome of the row that was just processed
    pub latest: BulkResult,
}

impl BulkProgress {
    /// Completed share of the run, `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }
}

/// Receiver for bulk run progress
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit_progress(&self, progress: &BulkProgress) -> Result<(), String>;
}

/// No-op sink for callers that only want the final report
#[derive(Debug, Default, Clone)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn emit_progress(&self, _progress: &BulkProgress) -> Result<(), String> {
        Ok(())
    }
}

/// Logs each step through `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingProgressSink;

#[async_trait]
impl ProgressSink for TracingProgressSink {
    async fn emit_progress(&self, progress: &BulkProgress) -> Result<(), String> {
        match &progress.latest.error {
            None => tracing::info!(
                "[{}/{}] created '{}' ({})",
                progress.completed,
                progress.total,
                progress.latest.name,
                progress.latest.id
            ),
            Some(error) => tracing::warn!(
                "[{}/{}] failed '{}': {}",
                progress.completed,
                progress.total,
                progress.latest.name,
                error
            ),
        }
        Ok(())
    }
}
