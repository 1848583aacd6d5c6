//! Text (terminal) reporter with colors and formatting

use super::score_percent;
use crate::models::{AuditReport, Report};
use anyhow::Result;
use console::style;

/// Width of an audit line before the value column
const LINE_WIDTH: usize = 60;

/// Colored marker for a 0..1 score
fn score_marker(score: f64) -> String {
    if score >= 0.9 {
        style("●").green().to_string()
    } else if score >= 0.5 {
        style("▲").yellow().to_string()
    } else {
        style("■").red().to_string()
    }
}

fn colored_score(score: f64) -> String {
    let pct = score_percent(score);
    if score >= 0.9 {
        style(pct).green().bold().to_string()
    } else if score >= 0.5 {
        style(pct).yellow().bold().to_string()
    } else {
        style(pct).red().bold().to_string()
    }
}

/// Render report as formatted terminal output
pub fn render(report: &Report) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} - {}@{}\n",
        style("Scorekeep Report").bold(),
        report.package_name,
        report.version
    ));
    out.push_str(&format!("{}\n", style("─".repeat(LINE_WIDTH + 10)).dim()));

    for plugin in &report.plugins {
        out.push_str(&format!("\n{} audits\n\n", style(&plugin.title).bold()));
        for audit in &plugin.audits {
            out.push_str(&audit_line(audit));
        }
    }

    if !report.categories.is_empty() {
        out.push_str(&format!("\n{}\n\n", style("Categories").bold()));
        out.push_str(&format!(
            "  {}\n",
            style(format!("{:<40} {:>6} {:>7}", "Category", "Score", "Audits")).dim()
        ));
        for category in &report.categories {
            let title: String = category.title.chars().take(40).collect();
            let score = category
                .score
                .map(colored_score)
                .unwrap_or_else(|| "-".to_string());
            // Colored strings carry escape codes, pad on the visible width
            let pad = 6usize.saturating_sub(console::measure_text_width(&score));
            out.push_str(&format!(
                "  {:<40} {}{} {:>7}\n",
                title,
                " ".repeat(pad),
                score,
                category.refs.len()
            ));
        }
    }

    out.push('\n');
    Ok(out)
}

fn audit_line(audit: &AuditReport) -> String {
    // Truncate with chars() so multi-byte titles never split
    let title: String = if audit.title.chars().count() > LINE_WIDTH - 4 {
        let mut t: String = audit.title.chars().take(LINE_WIDTH - 7).collect();
        t.push_str("...");
        t
    } else {
        audit.title.clone()
    };
    let dots = ".".repeat(LINE_WIDTH.saturating_sub(title.chars().count() + 2));
    format!(
        "{} {} {} {}\n",
        score_marker(audit.score),
        title,
        style(dots).dim(),
        style(audit.display()).bold()
    )
}
