//! Core data models for scorekeep
//!
//! These models describe what plugins produce and what a collection run
//! persists. Everything here serializes to camelCase JSON, which is the
//! on-disk format of `report.json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single measurement as returned by a plugin runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOutput {
    pub slug: String,
    pub value: f64,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AuditDetails>,
}

/// Extra detail attached to an audit output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDetails {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Severity of a single issue reported by an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
        }
    }
}

/// A problem found by an audit, optionally pointing at a source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub message: String,
    #[serde(default)]
    pub severity: IssueSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePosition {
    pub start_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

/// Audit metadata declared by a plugin before it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "docs_url")]
    pub docs_url: Option<String>,
}

/// An audit as stored in a report: declared metadata merged with runner output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    pub score: f64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AuditDetails>,
}

impl AuditReport {
    pub fn from_output(meta: &Audit, output: AuditOutput) -> Self {
        Self {
            slug: output.slug,
            title: meta.title.clone(),
            description: meta.description.clone(),
            docs_url: meta.docs_url.clone(),
            score: output.score,
            value: output.value,
            display_value: output.display_value,
            details: output.details,
        }
    }

    /// Display value if the producer gave one, raw value otherwise
    pub fn display(&self) -> String {
        match &self.display_value {
            Some(v) => v.clone(),
            None => format_value(self.value),
        }
    }
}

/// Weighted pointer from a group to an audit of the same plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    pub slug: String,
    pub weight: f64,
}

/// Weighted collection of audits within one plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "docs_url")]
    pub docs_url: Option<String>,
    pub refs: Vec<GroupRef>,
    /// Derived by the scoring engine, never supplied by config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Discriminant of a category ref
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Audit,
    Group,
}

impl std::fmt::Display for RefType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefType::Audit => write!(f, "audit"),
            RefType::Group => write!(f, "group"),
        }
    }
}

/// Weighted pointer from a category to an audit or group of any plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(rename = "type")]
    pub ref_type: RefType,
    pub plugin: String,
    pub slug: String,
    pub weight: f64,
}

impl CategoryRef {
    /// Identity of the ref used for duplicate detection and error messages
    pub fn key(&self) -> String {
        format!("{} :: {} / {}", self.ref_type, self.plugin, self.slug)
    }
}

/// Cross-plugin quality dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "docs_url")]
    pub docs_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not", alias = "is_binary")]
    pub is_binary: bool,
    pub refs: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Commit the report was collected on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub date: String,
    pub message: String,
    pub author: String,
}

/// Results of one plugin within a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginReport {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub date: String,
    pub duration: u64,
    pub audits: Vec<AuditReport>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl PluginReport {
    pub fn audit(&self, slug: &str) -> Option<&AuditReport> {
        self.audits.iter().find(|a| a.slug == slug)
    }

    pub fn group(&self, slug: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.slug == slug)
    }
}

/// Result of a whole collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub package_name: String,
    pub version: String,
    pub date: String,
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    pub plugins: Vec<PluginReport>,
}

impl Report {
    pub fn plugin(&self, slug: &str) -> Option<&PluginReport> {
        self.plugins.iter().find(|p| p.slug == slug)
    }

    pub fn audit_count(&self) -> usize {
        self.plugins.iter().map(|p| p.audits.len()).sum()
    }

    /// Look up the title of whatever a category ref points at
    pub fn ref_title(&self, r: &CategoryRef) -> Option<&str> {
        let plugin = self.plugin(&r.plugin)?;
        match r.ref_type {
            RefType::Audit => plugin.audit(&r.slug).map(|a| a.title.as_str()),
            RefType::Group => plugin.group(&r.slug).map(|g| g.title.as_str()),
        }
    }
}

/// Render a raw audit value without trailing zeros
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
