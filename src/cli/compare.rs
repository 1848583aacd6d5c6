//! Compare command - diff two persisted reports

use crate::compare::{compare_reports, ReportsDiff};
use crate::models::Report;
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

const DIFF_FILENAME: &str = "report-diff";

fn read_report(path: &Path) -> Result<Report> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid report {}", path.display()))
}

/// Write `report-diff.json` and `report-diff.md` into `output_dir`
fn write_diff(diff: &ReportsDiff, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let json_path = output_dir.join(format!("{}.json", DIFF_FILENAME));
    std::fs::write(&json_path, serde_json::to_string_pretty(diff)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    let md_path = output_dir.join(format!("{}.md", DIFF_FILENAME));
    std::fs::write(&md_path, diff.to_markdown())
        .with_context(|| format!("Failed to write {}", md_path.display()))?;

    Ok((json_path, md_path))
}

/// Run the compare command
pub(super) fn run(before: &Path, after: &Path, label: Option<String>, output_dir: &Path) -> Result<()> {
    let diff = compare_reports(&read_report(before)?, &read_report(after)?).with_labels(None, label);
    let (json_path, md_path) = write_diff(&diff, output_dir)?;

    if diff.has_changes() {
        println!(
            "{} {} categories, {} groups and {} audits changed",
            style("Δ").yellow(),
            diff.categories.changed.len(),
            diff.groups.changed.len(),
            diff.audits.changed.len()
        );
    } else {
        println!("{} No changes to report", style("✓").green());
    }
    println!("  {}", style(json_path.display()).cyan());
    println!("  {}", style(md_path.display()).cyan());
    Ok(())
}
