use crate::config::{is_valid_slug, PluginConfig};
use crate::models::AuditOutput;
use std::collections::HashSet;

/// Check the shape of a single audit measurement
pub fn check_audit_output(slug: &str, value: f64, score: f64) -> Result<(), String> {
    if !is_valid_slug(slug) {
        return Err(format!("Invalid audit slug '{}'", slug));
    }
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(format!("Audit {} has score {} outside [0, 1]", slug, score));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(format!("Audit {} has value {}, expected a non-negative number", slug, value));
    }
    Ok(())
}

/// Validate runner outputs against the plugin's declared audits
pub fn validate_audit_outputs(plugin: &PluginConfig, outputs: &[AuditOutput]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for output in outputs {
        check_audit_output(&output.slug, output.value, output.score)?;
        if !seen.insert(output.slug.as_str()) {
            return Err(format!("Audit {} was reported more than once", output.slug));
        }
        if plugin.audit(&output.slug).is_none() {
            return Err(format!(
                "Audit {} is not declared by plugin {}",
                output.slug, plugin.slug
            ));
        }
    }
    Ok(())
}
