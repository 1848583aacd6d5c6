//! Upload request contract
//!
//! scorekeep does not ship a portal transport. It builds an [`UploadRequest`]
//! and hands it to an [`Uploader`]; the binary uses [`DryRunUploader`], which
//! only logs what would be sent.

use crate::config::UploadConfig;
use crate::logging::Logger;
use crate::models::Report;
use anyhow::Result;
use std::time::Duration;

/// Everything a transport needs to send one report
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub server: &'a str,
    pub api_key: &'a str,
    pub organization: &'a str,
    pub project: &'a str,
    pub timeout: Option<Duration>,
    pub report: &'a Report,
}

impl<'a> UploadRequest<'a> {
    pub fn new(config: &'a UploadConfig, report: &'a Report) -> Self {
        Self {
            server: &config.server,
            api_key: &config.api_key,
            organization: &config.organization,
            project: &config.project,
            timeout: config.timeout.map(Duration::from_millis),
            report,
        }
    }

    /// Commit the report was collected on, or its date when there is none
    pub fn label(&self) -> String {
        self.report
            .commit
            .as_ref()
            .map(|c| c.hash.clone())
            .unwrap_or_else(|| self.report.date.clone())
    }
}

/// Sends a report to the portal
pub trait Uploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<()>;
}

/// Logs the request instead of sending it
pub struct DryRunUploader<'a> {
    logger: &'a dyn Logger,
}

impl<'a> DryRunUploader<'a> {
    pub fn new(logger: &'a dyn Logger) -> Self {
        Self { logger }
    }
}

impl Uploader for DryRunUploader<'_> {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<()> {
        self.logger.info(&format!(
            "Would upload report {} to {} ({}/{}, {} audits)",
            request.label(),
            request.server,
            request.organization,
            request.project,
            request.report.audit_count()
        ));
        Ok(())
    }
}
