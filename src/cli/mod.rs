//! CLI command definitions and handlers

mod collect;
mod compare;
mod history;

use crate::config::{load_config_file, load_core_config, CoreConfig};
use crate::reporters::OutputFormat;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// Scorekeep - collect, score and compare quality reports
#[derive(Parser, Debug)]
#[command(name = "scorekeep")]
#[command(
    version,
    about = "Run audit plugins, score them into weighted categories, and persist or compare the reports",
    after_help = "\
Examples:
  scorekeep                                   Collect with ./scorekeep.toml
  scorekeep collect --format md,stdout        Also write Markdown and print a summary
  scorekeep collect --only-plugins eslint     Run a single plugin
  scorekeep history --max-count 10            Replay the last 10 commits
  scorekeep compare --before a.json --after b.json"
)]
pub struct Cli {
    /// Config file (default: scorekeep.toml or .scorekeeprc.json in the current directory)
    #[arg(long, short = 'c', global = true, env = "SCOREKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel plugin workers (1-64, default: number of CPUs)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all plugins, score the results and persist the report (default)
    Collect {
        /// Only run these plugins (comma-separated slugs)
        #[arg(long, value_delimiter = ',')]
        only_plugins: Vec<String>,

        /// Directory reports are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Report file name without extension
        #[arg(long)]
        filename: Option<String>,

        /// Output formats: json, md, stdout (comma-separated)
        #[arg(long, short = 'f', value_delimiter = ',', value_parser = parse_format)]
        format: Vec<OutputFormat>,
    },

    /// Collect a report for each of a list of git revisions
    #[command(after_help = "\
Reports are written as <rev>-report.json into the output directory.
The working tree must be clean unless --force-clean is given; untracked
files in the output directory do not count and are never cleaned. The
original branch or tag is checked out again afterwards.")]
    History {
        /// Revisions to replay, oldest first (default: the last --max-count commits)
        #[arg(value_name = "REVS")]
        revs: Vec<String>,

        /// Number of commits to replay when no revisions are given
        #[arg(long, default_value = "5")]
        max_count: usize,

        /// Discard local changes before every checkout
        #[arg(long)]
        force_clean: bool,

        /// Do not upload reports even when an upload config exists
        #[arg(long)]
        skip_uploads: bool,
    },

    /// Compare two persisted JSON reports
    Compare {
        /// Report to compare from
        #[arg(long)]
        before: PathBuf,

        /// Report to compare to
        #[arg(long)]
        after: PathBuf,

        /// Label shown for the after side, e.g. a branch name
        #[arg(long)]
        label: Option<String>,
    },

    /// Print the resolved configuration as JSON
    PrintConfig,
}

/// Load the config from `--config` or the current directory
fn load_config(path: Option<&Path>) -> Result<CoreConfig> {
    match path {
        Some(path) => load_config_file(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_core_config(&cwd)
        }
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let workers = cli.workers.unwrap_or(0);

    match cli.command {
        Some(Commands::Collect {
            only_plugins,
            output_dir,
            filename,
            format,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            collect::run(
                config,
                &collect::CollectArgs {
                    only_plugins,
                    output_dir,
                    filename,
                    format,
                    workers,
                },
            )
        }

        Some(Commands::History {
            revs,
            max_count,
            force_clean,
            skip_uploads,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            history::run(
                config,
                &history::HistoryArgs {
                    revs,
                    max_count,
                    force_clean,
                    skip_uploads,
                    workers,
                },
            )
        }

        Some(Commands::Compare {
            before,
            after,
            label,
        }) => {
            // Only the output directory is needed; fall back to defaults without a config
            let config = match &cli.config {
                Some(path) => load_config_file(path)?,
                None => {
                    let cwd = std::env::current_dir().context("Failed to read current directory")?;
                    load_core_config(&cwd).unwrap_or_default()
                }
            };
            compare::run(&before, &after, label, &config.persist.output_dir)
        }

        Some(Commands::PrintConfig) => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }

        None => {
            let config = load_config(cli.config.as_deref())?;
            collect::run(
                config,
                &collect::CollectArgs {
                    workers,
                    ..Default::default()
                },
            )
        }
    }
}
