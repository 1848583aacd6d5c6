//! Report comparison
//!
//! Diffs two scored reports at three levels (categories, groups, audits).
//! Each level lists what changed, what was added, what was removed and what
//! stayed the same. Groups and audits are keyed by `(plugin, slug)`,
//! categories by slug.
//!
//! [`ReportsDiff::to_markdown`] produces the text posted by the comment
//! engine.

use crate::models::Report;
use crate::reporters::score_percent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scored thing as it appears in one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

/// Before and after of a number, with the difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub before: f64,
    pub after: f64,
    pub diff: f64,
}

impl Delta {
    fn new(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            diff: after - before,
        }
    }
}

/// Something present in both reports whose score or value moved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedEntry {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    pub scores: Delta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Delta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_values: Option<(Option<String>, Option<String>)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSection {
    pub changed: Vec<ChangedEntry>,
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub unchanged: Vec<DiffEntry>,
}

impl DiffSection {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Which report a side of the diff came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRef {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ReportRef {
    fn from_report(report: &Report) -> Self {
        Self {
            date: report.date.clone(),
            commit: report.commit.as_ref().map(|c| c.hash.clone()),
            label: None,
        }
    }

    fn describe(&self) -> String {
        match (&self.label, &self.commit) {
            (Some(label), _) => label.clone(),
            (None, Some(hash)) => format!("`{}`", hash.chars().take(7).collect::<String>()),
            (None, None) => self.date.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsDiff {
    pub before: ReportRef,
    pub after: ReportRef,
    pub categories: DiffSection,
    pub groups: DiffSection,
    pub audits: DiffSection,
}

/// Compare two scored reports
pub fn compare_reports(before: &Report, after: &Report) -> ReportsDiff {
    ReportsDiff {
        before: ReportRef::from_report(before),
        after: ReportRef::from_report(after),
        categories: diff_entries(category_entries(before), category_entries(after)),
        groups: diff_entries(group_entries(before), group_entries(after)),
        audits: diff_entries(audit_entries(before), audit_entries(after)),
    }
}

fn category_entries(report: &Report) -> Vec<DiffEntry> {
    report
        .categories
        .iter()
        .map(|c| DiffEntry {
            slug: c.slug.clone(),
            title: c.title.clone(),
            plugin: None,
            score: c.score.unwrap_or(0.0),
            value: None,
            display_value: None,
        })
        .collect()
}

fn group_entries(report: &Report) -> Vec<DiffEntry> {
    report
        .plugins
        .iter()
        .flat_map(|p| {
            p.groups.iter().map(move |g| DiffEntry {
                slug: g.slug.clone(),
                title: g.title.clone(),
                plugin: Some(p.slug.clone()),
                score: g.score.unwrap_or(0.0),
                value: None,
                display_value: None,
            })
        })
        .collect()
}

fn audit_entries(report: &Report) -> Vec<DiffEntry> {
    report
        .plugins
        .iter()
        .flat_map(|p| {
            p.audits.iter().map(move |a| DiffEntry {
                slug: a.slug.clone(),
                title: a.title.clone(),
                plugin: Some(p.slug.clone()),
                score: a.score,
                value: Some(a.value),
                display_value: a.display_value.clone(),
            })
        })
        .collect()
}

fn diff_entries(before: Vec<DiffEntry>, after: Vec<DiffEntry>) -> DiffSection {
    let key = |e: &DiffEntry| (e.plugin.clone(), e.slug.clone());
    let mut previous: HashMap<_, DiffEntry> = before.iter().map(|e| (key(e), e.clone())).collect();
    let mut section = DiffSection::default();

    for current in after {
        match previous.remove(&key(&current)) {
            None => section.added.push(current),
            Some(prev) => {
                let values = match (prev.value, current.value) {
                    (Some(b), Some(a)) => Some(Delta::new(b, a)),
                    _ => None,
                };
                let moved = prev.score != current.score || values.is_some_and(|v| v.diff != 0.0);
                if moved {
                    let display_values = (prev.display_value.is_some()
                        || current.display_value.is_some())
                    .then(|| (prev.display_value.clone(), current.display_value.clone()));
                    section.changed.push(ChangedEntry {
                        slug: current.slug,
                        title: current.title,
                        plugin: current.plugin,
                        scores: Delta::new(prev.score, current.score),
                        values,
                        display_values,
                    });
                } else {
                    section.unchanged.push(current);
                }
            }
        }
    }

    // Keep the before-report's order for removals
    section.removed = before
        .into_iter()
        .filter(|e| previous.contains_key(&key(e)))
        .collect();
    section
}

impl ReportsDiff {
    pub fn with_labels(mut self, before: Option<String>, after: Option<String>) -> Self {
        self.before.label = before;
        self.after.label = after;
        self
    }

    pub fn has_changes(&self) -> bool {
        self.categories.has_changes() || self.groups.has_changes() || self.audits.has_changes()
    }

    /// Markdown summary suitable for a review comment
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Scorekeep comparison\n\n");
        md.push_str(&format!(
            "Comparing {} (before) to {} (after).\n\n",
            self.before.describe(),
            self.after.describe()
        ));

        if !self.has_changes() {
            md.push_str("No changes to report.\n");
            return md;
        }

        if !self.categories.changed.is_empty()
            || !self.categories.added.is_empty()
            || !self.categories.removed.is_empty()
        {
            md.push_str("## Categories\n\n| Category | Previous score | Current score | Change |\n|---|---|---|---|\n");
            for c in &self.categories.changed {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    c.title,
                    score_percent(c.scores.before),
                    score_percent(c.scores.after),
                    score_change(c.scores.diff)
                ));
            }
            for c in &self.categories.added {
                md.push_str(&format!("| {} | - | {} | added |\n", c.title, score_percent(c.score)));
            }
            for c in &self.categories.removed {
                md.push_str(&format!("| {} | {} | - | removed |\n", c.title, score_percent(c.score)));
            }
            md.push('\n');
        }

        md.push_str(&section_table("Groups", "Group", &self.groups, false));
        md.push_str(&section_table("Audits", "Audit", &self.audits, true));

        let unchanged = self.audits.unchanged.len();
        if unchanged > 0 {
            md.push_str(&format!(
                "{} other audit{} unchanged.\n",
                unchanged,
                if unchanged == 1 { " is" } else { "s are" }
            ));
        }
        md
    }
}

fn section_table(heading: &str, noun: &str, section: &DiffSection, with_values: bool) -> String {
    if !section.has_changes() {
        return String::new();
    }
    let total = section.changed.len() + section.added.len() + section.removed.len();
    let mut md = format!(
        "## {}\n\n<details>\n<summary>{} {}{} changed</summary>\n\n",
        heading,
        total,
        noun.to_lowercase(),
        if total == 1 { "" } else { "s" }
    );

    if with_values {
        md.push_str(&format!(
            "| Plugin | {} | Previous value | Current value | Change |\n|---|---|---|---|---|\n",
            noun
        ));
    } else {
        md.push_str(&format!(
            "| Plugin | {} | Previous score | Current score | Change |\n|---|---|---|---|---|\n",
            noun
        ));
    }

    for c in &section.changed {
        let plugin = c.plugin.as_deref().unwrap_or("-");
        let (before, after) = match (&c.display_values, c.values) {
            (Some((b, a)), Some(v)) if with_values => (
                b.clone().unwrap_or_else(|| crate::models::format_value(v.before)),
                a.clone().unwrap_or_else(|| crate::models::format_value(v.after)),
            ),
            (_, Some(v)) if with_values => (
                crate::models::format_value(v.before),
                crate::models::format_value(v.after),
            ),
            _ => (
                score_percent(c.scores.before).to_string(),
                score_percent(c.scores.after).to_string(),
            ),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            plugin,
            c.title,
            before,
            after,
            score_change(c.scores.diff)
        ));
    }
    for e in &section.added {
        md.push_str(&format!(
            "| {} | {} | - | {} | added |\n",
            e.plugin.as_deref().unwrap_or("-"),
            e.title,
            entry_display(e, with_values)
        ));
    }
    for e in &section.removed {
        md.push_str(&format!(
            "| {} | {} | {} | - | removed |\n",
            e.plugin.as_deref().unwrap_or("-"),
            e.title,
            entry_display(e, with_values)
        ));
    }
    md.push_str("\n</details>\n\n");
    md
}

fn entry_display(entry: &DiffEntry, with_values: bool) -> String {
    match (&entry.display_value, entry.value) {
        (Some(d), _) if with_values => d.clone(),
        (None, Some(v)) if with_values => crate::models::format_value(v),
        _ => score_percent(entry.score).to_string(),
    }
}

/// Score change in points, e.g. `+12` or `-3`
fn score_change(diff: f64) -> String {
    let points = score_percent(diff);
    match points {
        0 => "±0".to_string(),
        p if p > 0 => format!("+{}", p),
        p => p.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_identical_reports_have_no_changes() {
        let report = test_report();
        let diff = compare_reports(&report, &report);
        assert!(!diff.has_changes());
        assert_eq!(diff.audits.unchanged.len(), 7);
        assert!(diff.to_markdown().contains("No changes to report."));
    }

    #[test]
    fn test_changed_audit_and_category() {
        let before = test_report();
        let mut after = before.clone();
        after.plugins[0].audits[0].score = 1.0;
        after.plugins[0].audits[0].value = 0.0;
        after.categories[0].score = Some(1.0);

        let diff = compare_reports(&before, &after);
        assert_eq!(diff.audits.changed.len(), 1);
        let audit = &diff.audits.changed[0];
        assert_eq!(audit.plugin.as_deref(), Some("cypress"));
        assert_eq!(audit.scores.diff, 0.5);
        assert_eq!(audit.values.map(|v| v.diff), Some(-5.0));

        assert_eq!(diff.categories.changed.len(), 1);
        let md = diff.to_markdown();
        assert!(md.contains("| Test results | 63 | 100 | +38 |"));
        assert!(md.contains("| cypress | Cypress e2e tests | 5 | 0 | +50 |"));
        assert!(md.contains("6 other audits are unchanged."));
    }

    #[test]
    fn test_value_only_change_counts() {
        let before = test_report();
        let mut after = before.clone();
        after.plugins[1].audits[0].value = 4.0;
        let diff = compare_reports(&before, &after);
        assert_eq!(diff.audits.changed.len(), 1);
        assert_eq!(diff.audits.changed[0].scores.diff, 0.0);
    }

    #[test]
    fn test_added_and_removed() {
        let before = test_report();
        let mut after = before.clone();
        let removed = after.plugins[1].audits.remove(4);
        after.categories.remove(1);
        let mut added = removed.clone();
        added.slug = "eslint-jest".into();
        added.title = "Jest rules".into();
        after.plugins[1].audits.push(added);

        let diff = compare_reports(&before, &after);
        assert_eq!(diff.audits.removed[0].slug, "eslint-cypress");
        assert_eq!(diff.audits.added[0].slug, "eslint-jest");
        assert_eq!(diff.categories.removed[0].slug, "bug-prevention");

        let md = diff.to_markdown();
        assert!(md.contains("| eslint | Jest rules | - | 0 | added |"));
        assert!(md.contains("| Bug prevention | 33 | - | removed |"));
    }

    #[test]
    fn test_labels_in_markdown() {
        let report = test_report();
        let diff = compare_reports(&report, &report)
            .with_labels(Some("main".into()), Some("feature".into()));
        assert!(diff.to_markdown().contains("Comparing main (before) to feature (after)."));
    }

    #[test]
    fn test_score_change_format() {
        assert_eq!(score_change(0.125), "+13");
        assert_eq!(score_change(-0.03), "-3");
        assert_eq!(score_change(0.001), "±0");
    }
}
