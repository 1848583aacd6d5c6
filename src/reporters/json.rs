//! JSON reporter
//!
//! Outputs the full Report as pretty-printed JSON. This is the format other
//! commands (`compare`, history uploads) read back.

use crate::models::Report;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
