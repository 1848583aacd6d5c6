//! Core configuration support
//!
//! Loads the project configuration from `scorekeep.toml` or
//! `.scorekeeprc.json` in the project root, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # scorekeep.toml
//!
//! [persist]
//! outputDir = ".scorekeep"
//! filename = "report"
//! format = ["json", "md"]
//!
//! [scoring]
//! binaryPolicy = "weighted-average"
//!
//! [[plugins]]
//! slug = "eslint"
//! title = "ESLint"
//! audits = [{ slug = "no-any", title = "No any" }]
//! runner = { command = "npx", args = ["eslint-to-audits"], outputFile = "tmp/eslint.json" }
//!
//! [[plugins]]
//! slug = "file-size"
//! title = "File size"
//! audits = [{ slug = "file-size", title = "File size budget" }]
//! runner = { builtin = "file-size", options = { directory = "dist", budget = 4200 } }
//!
//! [[categories]]
//! slug = "bug-prevention"
//! title = "Bug prevention"
//! refs = [{ type = "audit", plugin = "eslint", slug = "no-any", weight = 1 }]
//! ```

use crate::error::{CoreError, CoreResult};
use crate::models::{Audit, CategoryConfig, Group};
use crate::reporters::OutputFormat;
use crate::runner::Runner;
use crate::scoring::BinaryScorePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_PERSIST_OUTPUT_DIR: &str = ".scorekeep";
pub const DEFAULT_PERSIST_FILENAME: &str = "report";

/// Config files looked up in the project root, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["scorekeep.toml", ".scorekeeprc.json"];

/// A configured producer of audits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "docs_url")]
    pub docs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "package_name")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub audits: Vec<Audit>,
    #[serde(default)]
    pub groups: Vec<Group>,
    pub runner: Runner,
}

impl PluginConfig {
    pub fn audit(&self, slug: &str) -> Option<&Audit> {
        self.audits.iter().find(|a| a.slug == slug)
    }

    pub fn has_group(&self, slug: &str) -> bool {
        self.groups.iter().any(|g| g.slug == slug)
    }
}

/// Where and how reports are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistConfig {
    #[serde(default = "default_output_dir", alias = "output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_format")]
    pub format: Vec<OutputFormat>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PERSIST_OUTPUT_DIR)
}

fn default_filename() -> String {
    DEFAULT_PERSIST_FILENAME.to_string()
}

fn default_format() -> Vec<OutputFormat> {
    vec![OutputFormat::Json]
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            filename: default_filename(),
            format: default_format(),
        }
    }
}

/// Portal connection settings. Pure data; the transport lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    pub server: String,
    #[serde(alias = "api_key")]
    pub api_key: String,
    pub organization: String,
    pub project: String,
    /// Request timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Scoring customization
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    #[serde(default, alias = "binary_policy")]
    pub binary_policy: BinaryScorePolicy,
}

/// Everything a collection run needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl CoreConfig {
    pub fn plugin(&self, slug: &str) -> Option<&PluginConfig> {
        self.plugins.iter().find(|p| p.slug == slug)
    }

    pub fn validate(&self) -> CoreResult<()> {
        super::validate_config(self)
    }
}

/// Load the config from the first known file in `project_root`
///
/// Environment overrides are applied and the result is validated.
pub fn load_core_config(project_root: &Path) -> Result<CoreConfig> {
    let path = CONFIG_FILE_NAMES
        .iter()
        .map(|name| project_root.join(name))
        .find(|p| p.exists())
        .with_context(|| {
            format!(
                "No config found in {} (looked for {})",
                project_root.display(),
                CONFIG_FILE_NAMES.join(", ")
            )
        })?;
    load_config_file(&path)
}

/// Load, override from the environment, and validate a config file
pub fn load_config_file(path: &Path) -> Result<CoreConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    let mut config: CoreConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON config {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML config {}", path.display()))?,
    };
    debug!("Loaded config from {}", path.display());

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Overlay upload settings from `SCOREKEEP_*` variables
///
/// Variables win over the file. An upload section is only created from the
/// environment when server, key, organization and project are all present.
pub fn apply_env_overrides(config: &mut CoreConfig, env: impl Fn(&str) -> Option<String>) {
    let server = env("SCOREKEEP_SERVER");
    let api_key = env("SCOREKEEP_API_KEY");
    let organization = env("SCOREKEEP_ORGANIZATION");
    let project = env("SCOREKEEP_PROJECT");
    let timeout = env("SCOREKEEP_TIMEOUT").and_then(|t| t.parse::<u64>().ok());

    match config.upload.as_mut() {
        Some(upload) => {
            if let Some(v) = server {
                upload.server = v;
            }
            if let Some(v) = api_key {
                upload.api_key = v;
            }
            if let Some(v) = organization {
                upload.organization = v;
            }
            if let Some(v) = project {
                upload.project = v;
            }
            if timeout.is_some() {
                upload.timeout = timeout;
            }
        }
        None => {
            if let (Some(server), Some(api_key), Some(organization), Some(project)) =
                (server, api_key, organization, project)
            {
                config.upload = Some(UploadConfig {
                    server,
                    api_key,
                    organization,
                    project,
                    timeout,
                });
            }
        }
    }
}

/// Keep only the named plugins
///
/// Category refs to removed plugins are dropped, and so are categories left
/// without refs. Naming a plugin that is not configured is an error.
pub fn filter_plugins(config: &CoreConfig, only: &[String]) -> CoreResult<CoreConfig> {
    if only.is_empty() {
        return Ok(config.clone());
    }

    let unknown: Vec<&str> = only
        .iter()
        .filter(|slug| config.plugin(slug).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::Config(format!(
            "The following plugins are not configured: {}",
            unknown.join(", ")
        )));
    }

    let keep: HashSet<&str> = only.iter().map(String::as_str).collect();
    let mut filtered = config.clone();
    filtered.plugins.retain(|p| keep.contains(p.slug.as_str()));
    filtered.categories = config
        .categories
        .iter()
        .filter_map(|category| {
            let mut category = category.clone();
            category.refs.retain(|r| keep.contains(r.plugin.as_str()));
            (!category.refs.is_empty()).then_some(category)
        })
        .collect();
    Ok(filtered)
}
