//! History replay
//!
//! Runs the collect-and-persist pipeline once per revision:
//!
//! ```text
//! record original ref
//!   └─ for each revision (caller order):
//!        safe checkout ─► collect + persist `<rev>-report.json` ─► upload?
//! restore original ref (success and failure alike)
//! ```
//!
//! Revisions are strictly serial; two revisions never share the working
//! tree. The original ref is held by a [`CheckoutGuard`], so any early
//! return still puts the repository back where it was.

use super::{GitRepo, Vcs};
use crate::collector::{collect_and_persist, CollectOptions};
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::logging::Logger;
use crate::models::Report;
use crate::reporters::OutputFormat;
use crate::upload::{UploadRequest, Uploader};
use std::path::PathBuf;
use tracing::warn;

/// Settings of one history run
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub config: CoreConfig,
    pub skip_uploads: bool,
    /// Discard local changes before every checkout instead of failing
    pub force_clean_status: bool,
}

/// The per-revision pipeline
pub trait ReportPipeline {
    fn collect_and_persist(&self, config: &CoreConfig, logger: &dyn Logger) -> CoreResult<Report>;
}

/// Collect, score and persist with the core collector
#[derive(Debug, Clone, Default)]
pub struct CorePipeline {
    pub workers: usize,
    /// Stamp each report with the commit checked out here
    pub repo_path: Option<PathBuf>,
}

impl ReportPipeline for CorePipeline {
    fn collect_and_persist(&self, config: &CoreConfig, logger: &dyn Logger) -> CoreResult<Report> {
        let commit = self
            .repo_path
            .as_deref()
            .and_then(|path| GitRepo::open(path).and_then(|repo| repo.latest_commit()).ok());
        let options = CollectOptions::default()
            .with_workers(self.workers)
            .with_commit(commit);
        Ok(collect_and_persist(config, &options, logger)?.report)
    }
}

/// Holds the ref to return to once the walk is over
///
/// Call [`CheckoutGuard::restore`] on the success path to surface restore
/// errors; if the guard is dropped without it, the checkout is retried and a
/// failure is only logged.
pub struct CheckoutGuard<'a> {
    vcs: &'a dyn Vcs,
    original: String,
    force_clean: bool,
    restored: bool,
}

impl<'a> CheckoutGuard<'a> {
    /// Record the current branch or tag
    pub fn acquire(vcs: &'a dyn Vcs, force_clean: bool) -> CoreResult<Self> {
        let original = vcs.current_branch_or_tag()?;
        Ok(Self {
            vcs,
            original,
            force_clean,
            restored: false,
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Check the original ref back out
    ///
    /// If the clean-tree check refuses, the ref is still checked out without
    /// it and the refusal is returned.
    pub fn restore(mut self) -> CoreResult<()> {
        self.restored = true;
        let result = self.vcs.safe_checkout(&self.original, self.force_clean);
        if result.is_err() {
            if let Err(e) = self.vcs.checkout(&self.original) {
                warn!("Could not restore {}: {}", self.original, e);
            }
        }
        result
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.vcs.checkout(&self.original) {
            warn!("Could not restore {}: {}", self.original, e);
        }
    }
}

/// Replays collection across revisions
pub struct HistoryWalker<'a> {
    vcs: &'a dyn Vcs,
    pipeline: &'a dyn ReportPipeline,
    uploader: &'a dyn Uploader,
    logger: &'a dyn Logger,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        pipeline: &'a dyn ReportPipeline,
        uploader: &'a dyn Uploader,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            vcs,
            pipeline,
            uploader,
            logger,
        }
    }

    /// Collect a report for every revision, in the order given
    ///
    /// Returns the report identifiers (`<rev>-report`) in the same order.
    /// Upload failures are logged and do not stop the walk.
    pub fn walk(&self, options: &HistoryOptions, revisions: &[String]) -> CoreResult<Vec<String>> {
        let guard = CheckoutGuard::acquire(self.vcs, options.force_clean_status)?;
        self.logger
            .debug(&format!("Current branch or tag: {}", guard.original()));

        let mut reports = Vec::with_capacity(revisions.len());
        let mut uploads: Vec<(String, anyhow::Result<()>)> = Vec::new();

        for rev in revisions {
            self.logger.info(&format!("Collecting report for {}", rev));
            self.vcs.safe_checkout(rev, options.force_clean_status)?;

            let mut config = options.config.clone();
            config.persist.filename = report_name(rev);
            config.persist.format = vec![OutputFormat::Json];

            let report = self.pipeline.collect_and_persist(&config, self.logger)?;

            if !options.skip_uploads {
                if let Some(upload) = &config.upload {
                    let result = self.uploader.upload(&UploadRequest::new(upload, &report));
                    uploads.push((rev.clone(), result));
                }
            }
            reports.push(config.persist.filename);
        }

        guard.restore()?;
        self.log_uploads(&uploads);
        Ok(reports)
    }

    fn log_uploads(&self, uploads: &[(String, anyhow::Result<()>)]) {
        if uploads.is_empty() {
            return;
        }
        let failed: Vec<_> = uploads
            .iter()
            .filter_map(|(rev, r)| r.as_ref().err().map(|e| (rev, e)))
            .collect();
        self.logger.info(&format!(
            "Uploaded {} of {} reports",
            uploads.len() - failed.len(),
            uploads.len()
        ));
        for (rev, err) in failed {
            self.logger
                .warn(&format!("Upload failed for {}: {:#}", rev, err));
        }
    }
}

/// Report identifier for a revision; `/` is not allowed in file names
fn report_name(rev: &str) -> String {
    format!("{}-report", rev.replace('/', "-"))
}
