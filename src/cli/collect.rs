//! Collect command - run plugins, score and persist one report

use crate::collector::{collect, CollectOptions};
use crate::config::{filter_plugins, CoreConfig};
use crate::git::GitRepo;
use crate::logging::TracingLogger;
use crate::persist::{log_persisted_results, persist_report, PersistOutcome};
use crate::reporters::OutputFormat;
use crate::scoring::score_report;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default)]
pub(super) struct CollectArgs {
    pub only_plugins: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub filename: Option<String>,
    pub format: Vec<OutputFormat>,
    pub workers: usize,
}

/// Create spinner progress style
pub(super) fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Apply command-line overrides on top of the loaded config
fn apply_args(mut config: CoreConfig, args: &CollectArgs) -> Result<CoreConfig> {
    if !args.only_plugins.is_empty() {
        config = filter_plugins(&config, &args.only_plugins)?;
    }
    if let Some(dir) = &args.output_dir {
        config.persist.output_dir = dir.clone();
    }
    if let Some(filename) = &args.filename {
        config.persist.filename = filename.clone();
    }
    if !args.format.is_empty() {
        config.persist.format = args.format.clone();
    }
    Ok(config)
}

/// Run the collect command
pub(super) fn run(config: CoreConfig, args: &CollectArgs) -> Result<()> {
    let config = apply_args(config, args)?;
    let logger = TracingLogger;

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let commit = if GitRepo::is_git_repo(&cwd) {
        GitRepo::open(&cwd).and_then(|repo| repo.latest_commit()).ok()
    } else {
        None
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(create_spinner_style());
    spinner.set_message(format!("Running {} plugins...", config.plugins.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = spinner.clone();
    let options = CollectOptions::default()
        .with_workers(args.workers)
        .with_commit(commit)
        .with_progress_callback(Box::new(move |slug, done, total| {
            progress.set_message(format!("Finished {} ({}/{})", slug, done, total));
        }));

    let report = match collect(&config, &options).and_then(|r| score_report(&r, &config.scoring)) {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{}Collected {} audits from {} plugins",
        style("✓ ").green(),
        style(report.audit_count()).cyan(),
        style(report.plugins.len()).cyan()
    ));

    let results = persist_report(&report, &config.persist, &logger)?;
    log_persisted_results(&results, &logger);

    if PersistOutcome::from_results(&results) == PersistOutcome::AllFailed {
        anyhow::bail!("No report could be written to {}", config.persist.output_dir.display());
    }
    Ok(())
}
