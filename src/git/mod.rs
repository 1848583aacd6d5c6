//! Git integration
//!
//! Provides the version-control side of history replay:
//!
//! - [`Vcs`]: the operations the history walker needs, so it can be driven
//!   by a real repository or a test double
//! - [`GitRepo`]: the libgit2 implementation
//! - [`history`]: replaying collection across a list of revisions
//!
//! # Example
//!
//! ```no_run
//! use scorekeep::git::{prepare_hashes, GitRepo, Vcs};
//! use std::path::Path;
//!
//! let repo = GitRepo::open(Path::new(".")).unwrap();
//! let revisions = prepare_hashes(&repo.log(5).unwrap());
//! repo.safe_checkout(&revisions[0], false).unwrap();
//! ```

pub mod history;
mod repo;

pub use history::{
    CheckoutGuard, CorePipeline, HistoryOptions, HistoryWalker, ReportPipeline,
};
pub use repo::{prepare_hashes, CommitInfo, GitRepo};

use crate::error::{CoreError, CoreResult};

/// Version-control operations used by history replay
pub trait Vcs {
    /// Name of the checked-out branch, or the tag HEAD points at exactly
    fn current_branch_or_tag(&self) -> CoreResult<String>;

    /// Uncommitted changes as `"<kind>: <path>"` lines, untracked files included
    fn status_changes(&self) -> CoreResult<Vec<String>>;

    /// Hard-reset tracked files and delete untracked ones
    fn clean(&self) -> CoreResult<()>;

    /// Check out `rev` without any working-tree checks
    fn checkout(&self, rev: &str) -> CoreResult<()>;

    /// Check out `rev`, refusing to touch a dirty working tree
    ///
    /// With `force_clean` the tree is cleaned first.
    fn safe_checkout(&self, rev: &str, force_clean: bool) -> CoreResult<()> {
        if force_clean {
            self.clean()?;
        }
        let changes = self.status_changes()?;
        if !changes.is_empty() {
            return Err(CoreError::GitStatus { changes });
        }
        self.checkout(rev)
    }
}
