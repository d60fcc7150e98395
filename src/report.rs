//! Text/JSON rendering of a batch report and the dated report file.
use chrono::NaiveDate;
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::scan::{BatchReport, ScanResult};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Header line plus the target's transcript, blank-line terminated.
pub fn render_section(result: &ScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", result.target);
    for entry in &result.transcript {
        let _ = writeln!(out, "{}", entry);
    }
    out.push('\n');
    out
}

pub fn render_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total targets with matching repositories: {}",
        report.affected_count()
    );
    for target in report.affected_targets() {
        let _ = writeln!(out, "{}", target);
    }
    out
}

/// One section per target followed by the affected-target summary.
pub fn render_text(report: &BatchReport) -> String {
    let mut out: String = report.results().iter().map(render_section).collect();
    out.push_str(&render_summary(report));
    out
}

pub fn render_json(report: &BatchReport) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render(report: &BatchReport, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(report),
    }
}

pub fn file_name(date: NaiveDate, format: ReportFormat) -> String {
    format!("scan_report_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Write the report into `dir` (created if missing). A report from the same
/// day and format is replaced.
pub async fn write(
    dir: &Path,
    report: &BatchReport,
    format: ReportFormat,
    date: NaiveDate,
) -> Result<PathBuf, ReportError> {
    let body = render(report, format)?;
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(date, format));
    fs::write(&path, body).await?;
    info!(path = %path.display(), targets = report.len(), "report written");
    Ok(path)
}
