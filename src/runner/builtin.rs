//! Built-in function runners
//!
//! Config files cannot carry code, so in-process runners are referenced by
//! name: `runner = { builtin = "file-size", options = { ... } }`.

use super::RunnerFn;
use crate::models::{AuditDetails, AuditOutput, Issue, IssueSeverity, SourceLocation};
use crate::persist::format_bytes;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

pub const FILE_SIZE: &str = "file-size";

/// Names that [`resolve`] knows about
pub const BUILTIN_RUNNERS: &[&str] = &[FILE_SIZE];

/// Look up a built-in runner by name
///
/// Options are parsed when the runner is called, so a bad option surfaces as
/// a runner error for the owning plugin.
pub fn resolve(name: &str, options: &JsonValue) -> Option<RunnerFn> {
    match name {
        FILE_SIZE => {
            let options = options.clone();
            let run: RunnerFn = Arc::new(move |next: &dyn Fn(&str)| -> Result<Vec<AuditOutput>> {
                let options: FileSizeOptions = serde_json::from_value(options.clone())
                    .context("Invalid file-size options")?;
                file_size_audit(&options, next)
            });
            Some(run)
        }
        _ => {
            warn!("Unknown built-in runner `{}`", name);
            None
        }
    }
}

/// Options of the `file-size` runner
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSizeOptions {
    pub directory: PathBuf,
    /// Only files whose name matches this regex are checked
    #[serde(default)]
    pub pattern: Option<String>,
    /// Maximum size in bytes; without one every file passes
    #[serde(default)]
    pub budget: Option<u64>,
}

/// Check every file under `options.directory` against the size budget
///
/// Produces the `file-size` audit: value is the number of files over budget,
/// score is the share of files within budget, one issue per checked file.
pub fn file_size_audit(options: &FileSizeOptions, next: &dyn Fn(&str)) -> Result<Vec<AuditOutput>> {
    let pattern = options
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid file-size pattern")?;

    if !options.directory.is_dir() {
        anyhow::bail!("{} is not a directory", options.directory.display());
    }
    next(&format!("Scanning {}", options.directory.display()));

    let mut issues = Vec::new();
    for entry in WalkBuilder::new(&options.directory)
        .hidden(false)
        .git_ignore(true)
        .build()
    {
        let entry = entry.context("Failed to walk directory")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if let Some(re) = &pattern {
            if !re.is_match(name) {
                continue;
            }
        }
        let size = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        issues.push(assert_file_size(path, size, options.budget));
    }

    let total = issues.len();
    let errors = issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .count();
    let score = if total == 0 {
        1.0
    } else {
        1.0 - errors as f64 / total as f64
    };

    Ok(vec![AuditOutput {
        slug: FILE_SIZE.to_string(),
        value: errors as f64,
        score,
        display_value: Some(format!("{} {}", errors, if errors == 1 { "file" } else { "files" })),
        details: Some(AuditDetails { issues }),
    }])
}

fn assert_file_size(path: &Path, size: u64, budget: Option<u64>) -> Issue {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (message, severity) = match budget {
        Some(budget) if size > budget => (
            format!("File {} is {} (> {})", name, format_bytes(size), format_bytes(budget)),
            IssueSeverity::Error,
        ),
        _ => (format!("File {} OK", name), IssueSeverity::Info),
    };
    Issue {
        message,
        severity,
        source: Some(SourceLocation {
            file: path.to_path_buf(),
            position: None,
        }),
    }
}
