//! Report persistence
//!
//! JSON is always written. Markdown is written when requested, and `stdout`
//! prints the terminal summary through the logger. An empty format list means
//! `stdout`.
//!
//! Each file format is written independently: one format failing does not
//! stop the others. The caller gets one `Result` per file and decides how to
//! report them; [`PersistOutcome`] folds them into a single verdict.

use crate::config::PersistConfig;
use crate::error::{CoreError, CoreResult};
use crate::logging::Logger;
use crate::models::Report;
use crate::reporters::{file_extension, report_with_format, OutputFormat};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFile {
    pub path: PathBuf,
    pub size: u64,
}

pub type PersistResult = Result<PersistedFile, CoreError>;

/// Folded verdict over all per-format results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    AllSucceeded,
    Partial,
    AllFailed,
}

impl PersistOutcome {
    pub fn from_results(results: &[PersistResult]) -> Self {
        let failed = results.iter().filter(|r| r.is_err()).count();
        match failed {
            0 => PersistOutcome::AllSucceeded,
            n if n == results.len() => PersistOutcome::AllFailed,
            _ => PersistOutcome::Partial,
        }
    }
}

/// Formats actually produced for a requested list
///
/// JSON is always first; an empty list becomes `stdout`.
pub fn effective_formats(requested: &[OutputFormat]) -> Vec<OutputFormat> {
    let mut formats = vec![OutputFormat::Json];
    if requested.is_empty() {
        formats.push(OutputFormat::Stdout);
        return formats;
    }
    for format in [OutputFormat::Md, OutputFormat::Stdout] {
        if requested.contains(&format) {
            formats.push(format);
        }
    }
    formats
}

/// Write `report` in every configured format
///
/// Fails only when the output directory cannot be created; per-file failures
/// are returned as `Err` entries.
pub fn persist_report(
    report: &Report,
    persist: &PersistConfig,
    logger: &dyn Logger,
) -> CoreResult<Vec<PersistResult>> {
    let formats = effective_formats(&persist.format);

    if formats.contains(&OutputFormat::Stdout) {
        match report_with_format(report, OutputFormat::Stdout) {
            Ok(summary) => logger.log(&summary),
            Err(e) => logger.warn(&format!("Could not render stdout summary: {:#}", e)),
        }
    }

    ensure_output_dir(&persist.output_dir)?;

    let results = formats
        .par_iter()
        .filter_map(|&format| file_extension(format).map(|ext| (format, ext)))
        .map(|(format, ext)| {
            let path = persist
                .output_dir
                .join(format!("{}.{}", persist.filename, ext));
            write_format(report, format, path)
        })
        .collect();
    Ok(results)
}

fn ensure_output_dir(dir: &Path) -> CoreResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|source| CoreError::PersistDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_format(report: &Report, format: OutputFormat, path: PathBuf) -> PersistResult {
    let fail = |reason: String| CoreError::Persist {
        path: path.clone(),
        reason,
    };
    let content = report_with_format(report, format).map_err(|e| fail(format!("{:#}", e)))?;
    std::fs::write(&path, &content).map_err(|e| fail(e.to_string()))?;
    let size = std::fs::metadata(&path)
        .map(|m| m.len())
        .unwrap_or(content.len() as u64);
    debug!("Wrote {} ({} bytes)", path.display(), size);
    Ok(PersistedFile { path, size })
}

/// Log written files with sizes and failed ones with reasons
pub fn log_persisted_results(results: &[PersistResult], logger: &dyn Logger) {
    let (succeeded, failed): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.is_ok());

    if !succeeded.is_empty() {
        logger.log("Generated reports successfully: ");
        for file in succeeded.into_iter().flatten() {
            logger.log(&format!(
                "- {} ({})",
                console::style(file.path.display()).bold(),
                console::style(format_bytes(file.size)).dim()
            ));
        }
    }

    if !failed.is_empty() {
        logger.warn("Generated reports failed: ");
        for err in failed.into_iter().filter_map(|r| r.as_ref().err()) {
            logger.warn(&format!("- {}", err));
        }
    }
}

/// Human-readable size with base 1024, e.g. `1.95 kB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
