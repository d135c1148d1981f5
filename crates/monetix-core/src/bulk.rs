//! Bulk Operation Runner
//!
//! Creates many items one after another. Rows are never sent concurrently,
//! a failed row is recorded and the run moves on, and progress is reported
//! after every row.

use crate::catalog::{CreatedItem, ItemDraft, ResourceKind};
use crate::client::ResourceClient;
use crate::config::defaults::DEFAULT_BULK_ROW_DELAY_MS;
use crate::error::{MonetixError, Result};
use crate::events::{BulkProgress, ProgressSink};
use crate::pipeline::pause;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Id recorded for rows that upstream rejected
pub const FAILED_ROW_ID: &str = "-";

/// One row of a bulk create
pub type BulkRow = ItemDraft;

/// Anything that can create a single item
#[async_trait]
pub trait ItemCreator: Send + Sync {
    async fn create(&self, draft: &ItemDraft) -> Result<CreatedItem>;
}

/// Creates items of one kind in one universe through a [`ResourceClient`]
pub struct UniverseCreator<'a> {
    client: &'a ResourceClient,
    kind: ResourceKind,
    universe_id: String,
}

impl<'a> UniverseCreator<'a> {
    pub fn new(client: &'a ResourceClient, kind: ResourceKind, universe_id: impl Into<String>) -> Self {
        Self {
            client,
            kind,
            universe_id: universe_id.into(),
        }
    }
}

#[async_trait]
impl ItemCreator for UniverseCreator<'_> {
    async fn create(&self, draft: &ItemDraft) -> Result<CreatedItem> {
        self.client
            .create_item(self.kind, &self.universe_id, draft)
            .await
    }
}

/// Outcome of one submitted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub name: String,
    pub id: String,
    pub price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkResult {
    pub fn created(name: impl Into<String>, id: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            price,
            error: None,
        }
    }

    pub fn failed(row: &BulkRow, error: impl Into<String>) -> Self {
        Self {
            name: row.name.clone(),
            id: FAILED_ROW_ID.to_string(),
            price: row.price,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<CreatedItem> for BulkResult {
    fn from(created: CreatedItem) -> Self {
        Self::created(created.name, created.id, created.price)
    }
}

/// Every row's outcome, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub results: Vec<BulkResult>,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Tab separated `Name / ID / Price` table of the created items
    pub fn to_tsv(&self) -> String {
        let mut out = String::from("Name\tID\tPrice");
        for result in self.results.iter().filter(|r| r.is_success()) {
            out.push_str(&format!("\n{}\t{}\t{}", result.name, result.id, result.price));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Drives one bulk create from start to finish
pub struct BulkRunner {
    rows: Vec<BulkRow>,
    row_delay: Duration,
    state: RunState,
}

impl BulkRunner {
    /// Blank-named rows are dropped here and never submitted
    pub fn new(rows: Vec<BulkRow>) -> Self {
        let submitted = rows.len();
        let rows: Vec<BulkRow> = rows.into_iter().filter(BulkRow::has_name).collect();
        if rows.len() < submitted {
            info!("Skipping {} rows without a name", submitted - rows.len());
        }

        Self {
            rows,
            row_delay: Duration::from_millis(DEFAULT_BULK_ROW_DELAY_MS),
            state: RunState::Idle,
        }
    }

    pub fn with_row_delay(mut self, row_delay: Duration) -> Self {
        self.row_delay = row_delay;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Rows that will actually be submitted
    pub fn rows(&self) -> &[BulkRow] {
        &self.rows
    }

    /// Create every row in order
    ///
    /// Only individual row failures are absorbed; starting a runner twice or
    /// with no named rows is an error.
    pub async fn run<C, S>(&mut self, creator: &C, sink: &S) -> Result<BulkReport>
    where
        C: ItemCreator + ?Sized,
        S: ProgressSink + ?Sized,
    {
        if self.state != RunState::Idle {
            return Err(MonetixError::validation("This bulk run has already started."));
        }
        if self.rows.is_empty() {
            return Err(MonetixError::validation("Add at least one item with a name."));
        }

        self.state = RunState::Running;
        let total = self.rows.len();
        let mut report = BulkReport {
            results: Vec::with_capacity(total),
        };

        for (index, row) in self.rows.iter().enumerate() {
            let result = match creator.create(row).await {
                Ok(created) => BulkResult::from(created),
                Err(e) => {
                    warn!("Failed to create '{}': {}", row.name, e);
                    BulkResult::failed(row, e.to_string())
                }
            };

            let progress = BulkProgress {
                completed: index + 1,
                total,
                latest: result.clone(),
            };
            report.results.push(result);

            if let Err(e) = sink.emit_progress(&progress).await {
                warn!("Failed to emit progress: {}", e);
            }

            if index + 1 < total {
                pause(self.row_delay).await;
            }
        }

        self.state = RunState::Completed;
        info!(
            "Bulk create finished: {} created, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }
}
