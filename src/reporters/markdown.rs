//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Layout:
//! - Headline
//! - Metadata block (package, version, commit, date, duration, counts)
//! - Overview table: `Category | Score | Audits`
//! - One detail section per category listing every referenced audit

use super::score_percent;
use crate::models::{AuditReport, CategoryConfig, CategoryRef, RefType, Report};
use anyhow::Result;

const HEADLINE: &str = "Scorekeep Report";

/// Render report as GitHub-flavored Markdown
pub fn render(report: &Report) -> Result<String> {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", HEADLINE));
    md.push_str(&render_meta(report));
    md.push('\n');

    if report.categories.is_empty() {
        md.push_str("_No categories configured._\n\n");
    } else {
        md.push_str(&render_overview(report));
        md.push('\n');
        md.push_str(&render_details(report));
    }

    md.push_str("---\n\n_Made with scorekeep_\n");
    Ok(md)
}

fn render_meta(report: &Report) -> String {
    let commit = report
        .commit
        .as_ref()
        .map(|c| format!("{} - {}", c.message, c.hash))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "---\n\
         _Package Name: {}_  \n\
         _Version: {}_  \n\
         _Commit: {}_  \n\
         _Date: {}_  \n\
         _Duration: {}ms_  \n\
         _Plugins: {}_  \n\
         _Audits: {}_  \n\
         ---\n",
        report.package_name,
        report.version,
        commit,
        report.date,
        report.duration,
        report.plugins.len(),
        report.audit_count()
    )
}

fn render_overview(report: &Report) -> String {
    let mut md = String::from("## Overview\n\n| Category | Score | Audits |\n|----------|-------|--------|\n");
    for category in &report.categories {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            link(&category.title, &format!("#{}", category.slug)),
            category_score(category),
            category_audits(report, category).len()
        ));
    }
    md
}

fn render_details(report: &Report) -> String {
    let mut md = String::new();
    for category in &report.categories {
        md.push_str(&format!(
            "<a id=\"{}\"></a>\n## {} ({})\n\n",
            category.slug,
            category.title,
            category_score(category)
        ));
        if let Some(description) = &category.description {
            md.push_str(description);
            md.push_str("\n\n");
        }

        for r in &category.refs {
            md.push_str(&render_ref(report, r));
        }
        md.push('\n');
    }
    md
}

fn render_ref(report: &Report, r: &CategoryRef) -> String {
    let Some(plugin) = report.plugin(&r.plugin) else {
        return format!("- {} ({}) _not found_\n", r.slug, r.weight);
    };

    match r.ref_type {
        RefType::Audit => match plugin.audit(&r.slug) {
            Some(audit) => format!("- {}\n", audit_details(audit, r.weight)),
            None => format!("- {} ({}) _not found_\n", r.slug, r.weight),
        },
        RefType::Group => {
            let Some(group) = plugin.group(&r.slug) else {
                return format!("- {} ({}) _not found_\n", r.slug, r.weight);
            };
            let score = group
                .score
                .map(|s| score_percent(s).to_string())
                .unwrap_or_else(|| "-".to_string());
            let mut md = format!("- **{}** ({}, score {})\n", group.title, r.weight, score);
            for gr in &group.refs {
                if let Some(audit) = plugin.audit(&gr.slug) {
                    md.push_str(&format!("  - {}\n", audit_details(audit, gr.weight)));
                }
            }
            md
        }
    }
}

/// Collapsible block with the audit's description and docs link
fn audit_details(audit: &AuditReport, weight: f64) -> String {
    let summary = format!(
        "{} ({}) - score {}, {}",
        audit.title,
        weight,
        score_percent(audit.score),
        audit.display()
    );
    let mut content = String::new();
    if let Some(description) = &audit.description {
        content.push_str(description);
        content.push_str("<br/>");
    }
    if let Some(url) = &audit.docs_url {
        content.push_str(&link("Documentation", url));
    }
    if content.is_empty() {
        return summary;
    }
    format!(
        "<details><summary>{}</summary>{}</details>",
        summary, content
    )
}

fn category_score(category: &CategoryConfig) -> String {
    category
        .score
        .map(|s| score_percent(s).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Audits a category reaches, groups expanded
fn category_audits<'a>(report: &'a Report, category: &CategoryConfig) -> Vec<&'a AuditReport> {
    let mut audits = Vec::new();
    for r in &category.refs {
        let Some(plugin) = report.plugin(&r.plugin) else {
            continue;
        };
        match r.ref_type {
            RefType::Audit => audits.extend(plugin.audit(&r.slug)),
            RefType::Group => {
                if let Some(group) = plugin.group(&r.slug) {
                    audits.extend(group.refs.iter().filter_map(|gr| plugin.audit(&gr.slug)));
                }
            }
        }
    }
    audits
}

fn link(text: &str, href: &str) -> String {
    format!("[{}]({})", text, href)
}
