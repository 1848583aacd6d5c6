//! Config validation
//!
//! Structural problems (bad slugs, duplicates, negative weights, a bad upload
//! server) are collected and reported together as one `Config` error.
//! Category refs that point at nothing are `UserInput` errors.

use super::{CoreConfig, PluginConfig, UploadConfig};
use crate::error::{CoreError, CoreResult};
use crate::models::{CategoryConfig, RefType};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

/// Lowercase alphanumeric words joined by single hyphens, e.g. `max-lines`
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"))
        .is_match(slug)
}

/// Validate a whole config before anything runs
pub fn validate_config(config: &CoreConfig) -> CoreResult<()> {
    let mut problems = Vec::new();

    for duplicate in duplicates(config.plugins.iter().map(|p| p.slug.as_str())) {
        problems.push(format!("Plugin slugs are not unique: {}", duplicate));
    }
    for plugin in &config.plugins {
        check_plugin(plugin, &mut problems);
    }

    for duplicate in duplicates(config.categories.iter().map(|c| c.slug.as_str())) {
        problems.push(format!("Category slugs are not unique: {}", duplicate));
    }
    for category in &config.categories {
        check_category(category, &mut problems);
    }

    if let Some(upload) = &config.upload {
        check_upload(upload, &mut problems);
    }

    if !problems.is_empty() {
        return Err(CoreError::Config(problems.join("\n")));
    }

    check_category_refs(config)
}

fn check_plugin(plugin: &PluginConfig, problems: &mut Vec<String>) {
    let slug = &plugin.slug;
    if !is_valid_slug(slug) {
        problems.push(format!("Invalid plugin slug '{}'", slug));
    }
    if plugin.audits.is_empty() {
        problems.push(format!("Plugin {} declares no audits", slug));
    }
    for audit in &plugin.audits {
        if !is_valid_slug(&audit.slug) {
            problems.push(format!("Invalid audit slug '{}' in plugin {}", audit.slug, slug));
        }
    }
    for duplicate in duplicates(plugin.audits.iter().map(|a| a.slug.as_str())) {
        problems.push(format!("In plugin {} the audit slugs are not unique: {}", slug, duplicate));
    }
    for duplicate in duplicates(plugin.groups.iter().map(|g| g.slug.as_str())) {
        problems.push(format!("In plugin {} the group slugs are not unique: {}", slug, duplicate));
    }

    for group in &plugin.groups {
        if !is_valid_slug(&group.slug) {
            problems.push(format!("Invalid group slug '{}' in plugin {}", group.slug, slug));
        }
        for duplicate in duplicates(group.refs.iter().map(|r| r.slug.as_str())) {
            problems.push(format!(
                "In group {} of plugin {} the refs are not unique: {}",
                group.slug, slug, duplicate
            ));
        }
        for r in &group.refs {
            if plugin.audit(&r.slug).is_none() {
                problems.push(format!(
                    "Group {} of plugin {} references unknown audit {}",
                    group.slug, slug, r.slug
                ));
            }
            check_weight(r.weight, &format!("{}/{}/{}", slug, group.slug, r.slug), problems);
        }
        if !group.refs.is_empty() && group.refs.iter().all(|r| r.weight == 0.0) {
            problems.push(format!(
                "Group {} of plugin {} has only zero-weight refs",
                group.slug, slug
            ));
        }
    }
}

fn check_category(category: &CategoryConfig, problems: &mut Vec<String>) {
    if !is_valid_slug(&category.slug) {
        problems.push(format!("Invalid category slug '{}'", category.slug));
    }
    if category.refs.is_empty() {
        problems.push(format!("Category {} has no refs", category.slug));
        return;
    }
    for duplicate in duplicates(category.refs.iter().map(|r| r.key())) {
        problems.push(format!(
            "In the categories, the following audit or group refs are duplicates: {}",
            duplicate
        ));
    }
    for r in &category.refs {
        check_weight(r.weight, &format!("{} -> {}", category.slug, r.key()), problems);
    }
    if category.refs.iter().all(|r| r.weight == 0.0) {
        problems.push(format!("Category {} has only zero-weight refs", category.slug));
    }
}

fn check_weight(weight: f64, at: &str, problems: &mut Vec<String>) {
    if !weight.is_finite() || weight < 0.0 {
        problems.push(format!("Weight {} of {} must be a non-negative number", weight, at));
    }
}

fn check_upload(upload: &UploadConfig, problems: &mut Vec<String>) {
    match url::Url::parse(&upload.server) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        Ok(u) => problems.push(format!("Upload server must be http(s), got {}", u.scheme())),
        Err(e) => problems.push(format!("Upload server '{}' is not a URL: {}", upload.server, e)),
    }
    for (name, value) in [
        ("apiKey", &upload.api_key),
        ("organization", &upload.organization),
        ("project", &upload.project),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("Upload {} must not be empty", name));
        }
    }
}

/// Every category ref must name a declared audit or group of a configured plugin
fn check_category_refs(config: &CoreConfig) -> CoreResult<()> {
    for category in &config.categories {
        for r in &category.refs {
            let Some(plugin) = config.plugin(&r.plugin) else {
                return Err(CoreError::UserInput(format!(
                    "Category {} has invalid ref - plugin {} is not configured",
                    category.slug, r.plugin
                )));
            };
            let found = match r.ref_type {
                RefType::Audit => plugin.audit(&r.slug).is_some(),
                RefType::Group => plugin.has_group(&r.slug),
            };
            if !found {
                return Err(CoreError::UserInput(format!(
                    "Category {} has invalid ref - {} with slug {} not found in {} plugin",
                    category.slug, r.ref_type, r.slug, r.plugin
                )));
            }
        }
    }
    Ok(())
}

fn duplicates<I, S>(items: I) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str> + Clone + std::hash::Hash + Eq,
{
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if !seen.insert(item.clone()) && reported.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::core_config::tests::{category, plugin};
    use crate::models::{CategoryRef, Group, GroupRef};

    fn base_config() -> CoreConfig {
        CoreConfig {
            plugins: vec![plugin("eslint", &["no-any", "max-lines"])],
            categories: vec![category("quality", &[("eslint", "no-any", 1.0)])],
            ..Default::default()
        }
    }

    #[test]
    fn test_slug_format() {
        assert!(is_valid_slug("max-lines"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug("Max-Lines"));
        assert!(!is_valid_slug("max--lines"));
        assert!(!is_valid_slug("-max"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_duplicate_category_refs_rejected() {
        let mut config = base_config();
        config.categories[0] =
            category("quality", &[("eslint", "no-any", 1.0), ("eslint", "no-any", 2.0)]);
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("audit :: eslint / no-any"));
    }

    #[test]
    fn test_duplicate_plugin_and_audit_slugs_rejected() {
        let mut config = base_config();
        config.plugins.push(plugin("eslint", &["x", "x"]));
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("Plugin slugs are not unique: eslint"));
        assert!(msg.contains("audit slugs are not unique: x"));
    }

    #[test]
    fn test_zero_weight_category_rejected() {
        let mut config = base_config();
        config.categories[0] = category("quality", &[("eslint", "no-any", 0.0)]);
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("zero-weight"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = base_config();
        config.categories[0] = category("quality", &[("eslint", "no-any", -1.0)]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unresolved_category_ref_is_user_input_error() {
        let mut config = base_config();
        config.categories[0] = category("quality", &[("eslint", "missing-audit", 1.0)]);
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::UserInput(_)));
        assert!(err.to_string().contains("missing-audit"));
    }

    #[test]
    fn test_group_ref_resolution() {
        let mut config = base_config();
        config.plugins[0].groups.push(Group {
            slug: "style".into(),
            title: "Style".into(),
            description: None,
            docs_url: None,
            refs: vec![GroupRef { slug: "max-lines".into(), weight: 1.0 }],
            score: None,
        });
        config.categories[0].refs.push(CategoryRef {
            ref_type: RefType::Group,
            plugin: "eslint".into(),
            slug: "style".into(),
            weight: 2.0,
        });
        assert!(validate_config(&config).is_ok());

        config.plugins[0].groups[0].refs[0].slug = "nope".into();
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("references unknown audit nope"));
    }

    #[test]
    fn test_upload_server_must_be_url() {
        let mut config = base_config();
        config.upload = Some(UploadConfig {
            server: "not a url".into(),
            api_key: "k".into(),
            organization: "o".into(),
            project: "p".into(),
            timeout: None,
        });
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("is not a URL"));
    }
}
