//! History command - collect a report per git revision

use crate::config::CoreConfig;
use crate::git::{prepare_hashes, CorePipeline, GitRepo, HistoryOptions, HistoryWalker};
use crate::logging::TracingLogger;
use crate::upload::DryRunUploader;
use anyhow::{Context, Result};
use console::style;

#[derive(Debug, Default)]
pub(super) struct HistoryArgs {
    pub revs: Vec<String>,
    pub max_count: usize,
    pub force_clean: bool,
    pub skip_uploads: bool,
    pub workers: usize,
}

/// Run the history command
pub(super) fn run(config: CoreConfig, args: &HistoryArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let repo = GitRepo::open(&cwd)
        .with_context(|| format!("{} is not inside a git repository", cwd.display()))?
        .preserve_untracked(&cwd.join(&config.persist.output_dir));

    let revisions = if args.revs.is_empty() {
        prepare_hashes(&repo.log(args.max_count)?)
    } else {
        args.revs.clone()
    };
    if revisions.is_empty() {
        anyhow::bail!("No revisions to replay");
    }

    println!(
        "\n{} Replaying {} revisions\n",
        style("▶").cyan(),
        style(revisions.len()).bold()
    );

    let logger = TracingLogger;
    let uploader = DryRunUploader::new(&logger);
    let pipeline = CorePipeline {
        workers: args.workers,
        repo_path: Some(cwd.clone()),
    };
    let options = HistoryOptions {
        config,
        skip_uploads: args.skip_uploads,
        force_clean_status: args.force_clean,
    };

    let reports = HistoryWalker::new(&repo, &pipeline, &uploader, &logger)
        .walk(&options, &revisions)?;

    println!("\n{} Generated {} reports:", style("✓").green(), reports.len());
    for name in &reports {
        let path = options.config.persist.output_dir.join(format!("{}.json", name));
        println!("  {}", style(path.display()).cyan());
    }
    Ok(())
}
