//! Output reporters for scorekeep reports
//!
//! Supports three output formats:
//! - `json` - The full report, pretty-printed (always persisted)
//! - `md` - GitHub-flavored Markdown with category overview and details
//! - `stdout` - Terminal summary with colors

mod json;
mod markdown;
mod text;

use crate::models::Report;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[serde(alias = "markdown")]
    Md,
    Stdout,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Md),
            "stdout" | "text" | "terminal" => Ok(OutputFormat::Stdout),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: json, md, stdout",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Md => write!(f, "md"),
            OutputFormat::Stdout => write!(f, "stdout"),
        }
    }
}

/// Render a report using an OutputFormat enum
pub fn report_with_format(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::render(report),
        OutputFormat::Md => markdown::render(report),
        OutputFormat::Stdout => text::render(report),
    }
}

/// File extension of a format, `None` for formats that are never written to disk
pub fn file_extension(format: OutputFormat) -> Option<&'static str> {
    match format {
        OutputFormat::Json => Some("json"),
        OutputFormat::Md => Some("md"),
        OutputFormat::Stdout => None,
    }
}

/// Score as a whole percentage, e.g. `0.625` -> `63`
pub(crate) fn score_percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}
