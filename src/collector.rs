//! Collection of plugin results into a report
//!
//! The collector runs every configured plugin and assembles the raw,
//! unscored [`Report`]:
//! - Plugins run on a bounded rayon pool, but `Report.plugins` always keeps
//!   configuration order
//! - Any plugin failure fails the whole collection
//! - The assembled report is validated again before it is returned
//!
//! [`collect_and_persist`] chains collection, scoring and persistence.

use crate::config::{CoreConfig, PluginConfig};
use crate::error::{CoreError, CoreResult};
use crate::logging::Logger;
use crate::models::{AuditReport, Commit, PluginReport, Report};
use crate::persist::{log_persisted_results, persist_report, PersistResult};
use crate::runner::{check_audit_output, execute_plugin, RunnerResult};
use crate::scoring::score_report;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Progress callback: `(plugin_slug, done, total)`
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Settings of one collection run
#[derive(Default)]
pub struct CollectOptions {
    /// Worker threads for plugin execution (0 = auto-detect)
    pub workers: usize,
    /// Commit stamped on the report, if known
    pub commit: Option<Commit>,
    pub progress: Option<ProgressCallback>,
}

impl CollectOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_commit(mut self, commit: Option<Commit>) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn thread_count(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            self.workers
        }
    }
}

/// Run every plugin and assemble an unscored report
pub fn collect(config: &CoreConfig, options: &CollectOptions) -> CoreResult<Report> {
    if config.plugins.is_empty() {
        return Err(CoreError::NoPlugins);
    }

    let date = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let start = Instant::now();
    let total = config.plugins.len();
    let completed = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.thread_count())
        .build()
        .map_err(|e| CoreError::Io(std::io::Error::other(e)))?;

    info!("Collecting {} plugin(s)", total);
    let results: Vec<CoreResult<RunnerResult>> = pool.install(|| {
        config
            .plugins
            .par_iter()
            .map(|plugin| {
                let slug = plugin.slug.as_str();
                let result = execute_plugin(plugin, &|msg: &str| debug!("[{}] {}", slug, msg));

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(callback) = &options.progress {
                    callback(slug, done, total);
                }
                result
            })
            .collect()
    });

    let plugins = config
        .plugins
        .iter()
        .zip(results)
        .map(|(plugin, result)| result.map(|r| plugin_report(plugin, r)))
        .collect::<CoreResult<Vec<_>>>()?;

    let report = Report {
        package_name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        date,
        duration: start.elapsed().as_millis() as u64,
        commit: options.commit.clone(),
        categories: config.categories.clone(),
        plugins,
    };

    validate_report(&report)?;
    Ok(report)
}

/// Merge declared audit metadata with what the runner returned
fn plugin_report(plugin: &PluginConfig, result: RunnerResult) -> PluginReport {
    let audits = result
        .audits
        .into_iter()
        .filter_map(|output| {
            // Runner validation already rejected undeclared slugs
            let meta = plugin.audit(&output.slug)?;
            Some(AuditReport::from_output(meta, output))
        })
        .collect();

    PluginReport {
        slug: plugin.slug.clone(),
        title: plugin.title.clone(),
        icon: plugin.icon.clone(),
        description: plugin.description.clone(),
        docs_url: plugin.docs_url.clone(),
        package_name: plugin.package_name.clone(),
        version: plugin.version.clone(),
        date: result.date,
        duration: result.duration,
        audits,
        groups: plugin.groups.clone(),
    }
}

/// Validate every audit of an assembled report
///
/// Catches reports built by hand that never went through a runner.
pub fn validate_report(report: &Report) -> CoreResult<()> {
    for plugin in &report.plugins {
        let mut seen = HashSet::new();
        for audit in &plugin.audits {
            check_audit_output(&audit.slug, audit.value, audit.score)
                .map_err(|e| CoreError::runner(&plugin.slug, e))?;
            if !seen.insert(audit.slug.as_str()) {
                return Err(CoreError::runner(
                    &plugin.slug,
                    format!("Audit {} appears more than once", audit.slug),
                ));
            }
        }
    }
    Ok(())
}

/// A scored report and the outcome of each persisted format
#[derive(Debug)]
pub struct CollectOutcome {
    pub report: Report,
    pub persisted: Vec<PersistResult>,
}

/// Collect, score and persist; log what was written
pub fn collect_and_persist(
    config: &CoreConfig,
    options: &CollectOptions,
    logger: &dyn Logger,
) -> CoreResult<CollectOutcome> {
    let report = collect(config, options)?;
    let report = score_report(&report, &config.scoring)?;
    let persisted = persist_report(&report, &config.persist, logger)?;
    log_persisted_results(&persisted, logger);
    Ok(CollectOutcome { report, persisted })
}
