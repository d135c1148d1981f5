//! Terminal output
//!
//! Results go to stdout, one line per record, either as readable text or
//! as JSON lines. Logs stay on stderr.

use async_trait::async_trait;
use monetix_core::bulk::BulkReport;
use monetix_core::catalog::{CatalogItem, CreatedItem};
use monetix_core::events::{BulkProgress, ProgressSink, TracingProgressSink};
use monetix_core::session::Session;
use serde_json::json;

/// Prints each bulk step as it completes
#[derive(Debug, Clone)]
pub struct StdoutProgressSink {
    /// Whether to print in JSON format
    pub json_output: bool,
}

impl StdoutProgressSink {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }
}

#[async_trait]
impl ProgressSink for StdoutProgressSink {
    async fn emit_progress(&self, progress: &BulkProgress) -> Result<(), String> {
        println!("{}", format_progress(progress, self.json_output)?);
        Ok(())
    }
}

/// Where bulk progress goes for one run
#[derive(Debug, Clone)]
pub enum ProgressOutput {
    /// Log lines on stderr, leaving stdout to the final report
    Log(TracingProgressSink),
    Stdout(StdoutProgressSink),
}

impl ProgressOutput {
    /// TSV output owns stdout, so progress moves to the log
    pub fn select(json_output: bool, tsv: bool) -> Self {
        if tsv {
            ProgressOutput::Log(TracingProgressSink)
        } else {
            ProgressOutput::Stdout(StdoutProgressSink::new(json_output))
        }
    }
}

#[async_trait]
impl ProgressSink for ProgressOutput {
    async fn emit_progress(&self, progress: &BulkProgress) -> Result<(), String> {
        match self {
            ProgressOutput::Log(sink) => sink.emit_progress(progress).await,
            ProgressOutput::Stdout(sink) => sink.emit_progress(progress).await,
        }
    }
}

pub fn format_progress(progress: &BulkProgress, json_output: bool) -> Result<String, String> {
    if json_output {
        let line = json!({
            "event": "bulk_progress",
            "completed": progress.completed,
            "total": progress.total,
            "percent": progress.percent(),
            "latest": progress.latest,
        });
        return serde_json::to_string(&line).map_err(|e| e.to_string());
    }

    let latest = &progress.latest;
    let outcome = match &latest.error {
        None => format!("created {} ({}) at {} Robux", latest.name, latest.id, latest.price),
        Some(error) => format!("failed {}: {}", latest.name, error),
    };
    Ok(format!(
        "[{}/{} {:>3}%] {}",
        progress.completed,
        progress.total,
        progress.percent(),
        outcome
    ))
}

pub fn format_item(item: &CatalogItem) -> String {
    let sale = if item.is_for_sale { "on sale" } else { "off sale" };
    let regional = if item.is_regional_pricing_enabled {
        ", regional pricing"
    } else {
        ""
    };
    format!(
        "{}\t{}\t{} Robux\t{}{}",
        item.id, item.name, item.price, sale, regional
    )
}

pub fn print_items(items: &[CatalogItem], json_output: bool) -> Result<(), String> {
    if json_output {
        for item in items {
            println!("{}", serde_json::to_string(item).map_err(|e| e.to_string())?);
        }
    } else {
        for item in items {
            println!("{}", format_item(item));
        }
        println!("{} item(s)", items.len());
    }
    Ok(())
}

pub fn print_created(created: &CreatedItem, json_output: bool) -> Result<(), String> {
    if json_output {
        println!("{}", serde_json::to_string(created).map_err(|e| e.to_string())?);
    } else {
        println!(
            "Created {} ({}) at {} Robux",
            created.name, created.id, created.price
        );
    }
    Ok(())
}

pub fn print_report(report: &BulkReport, json_output: bool, tsv: bool) -> Result<(), String> {
    print!("{}", format_report(report, json_output, tsv)?);
    Ok(())
}

/// Final report text, newline terminated
pub fn format_report(report: &BulkReport, json_output: bool, tsv: bool) -> Result<String, String> {
    if tsv {
        return Ok(format!("{}\n", report.to_tsv()));
    }
    if json_output {
        let summary = json!({
            "event": "bulk_completed",
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "results": report.results,
        });
        let line = serde_json::to_string(&summary).map_err(|e| e.to_string())?;
        return Ok(format!("{line}\n"));
    }
    Ok(format!(
        "Bulk create finished: {} succeeded, {} failed\n",
        report.succeeded(),
        report.failed()
    ))
}

pub fn format_session(session: &Session) -> String {
    format!(
        "{}\t{}\tuniverse {}\t{}",
        session.id,
        session.experience_name,
        session.universe_id,
        mask_key(&session.api_key)
    )
}

pub fn print_sessions(sessions: &[Session], json_output: bool) -> Result<(), String> {
    if json_output {
        for session in sessions {
            let line = json!({
                "id": session.id,
                "experienceName": session.experience_name,
                "universeId": session.universe_id,
                "lastUsed": session.last_used,
            });
            println!("{}", serde_json::to_string(&line).map_err(|e| e.to_string())?);
        }
    } else if sessions.is_empty() {
        println!("No saved sessions");
    } else {
        for session in sessions {
            println!("{}", format_session(session));
        }
    }
    Ok(())
}

/// Last four characters only
fn mask_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
