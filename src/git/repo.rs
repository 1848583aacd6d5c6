//! libgit2-backed repository access

use super::Vcs;
use crate::error::{CoreError, CoreResult};
use crate::models::Commit;
use chrono::{TimeZone, Utc};
use git2::{build::CheckoutBuilder, BranchType, Repository, ResetType, Sort, Status, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Information about a git commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    /// Short hash (12 characters)
    pub short_hash: String,
    pub author: String,
    /// Commit timestamp (ISO 8601)
    pub timestamp: String,
    /// Commit message (first line)
    pub message: String,
}

/// Git repository opened with libgit2
pub struct GitRepo {
    repo: Repository,
    /// Untracked directory (workdir-relative) that is neither reported nor cleaned
    preserved: Option<PathBuf>,
}

impl GitRepo {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> CoreResult<Self> {
        let repo = Repository::discover(path)?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self {
            repo,
            preserved: None,
        })
    }

    /// Leave untracked files under `dir` alone
    ///
    /// Reports written there during a walk then neither block the next
    /// checkout nor get removed by a forced clean. Paths outside the working
    /// directory are ignored.
    pub fn preserve_untracked(mut self, dir: &Path) -> Self {
        let workdir = self.repo.workdir().map(canonical);
        self.preserved = workdir.and_then(|root| {
            canonical(dir)
                .strip_prefix(&root)
                .ok()
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(Path::to_path_buf)
        });
        self
    }

    /// Check if a path is inside a git repository
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Commits reachable from HEAD, newest first
    pub fn log(&self, max_count: usize) -> CoreResult<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        for oid in revwalk.take(max_count) {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit_info(&commit));
        }
        Ok(commits)
    }

    /// The commit HEAD points at, in report form
    pub fn latest_commit(&self) -> CoreResult<Commit> {
        let commit = self.repo.head()?.peel_to_commit()?;
        let info = commit_info(&commit);
        Ok(Commit {
            hash: info.hash,
            date: info.timestamp,
            message: info.message,
            author: info.author,
        })
    }

    fn statuses(&self) -> CoreResult<Vec<(Status, String)>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| Some((entry.status(), entry.path()?.to_string())))
            .filter(|(status, path)| !self.is_preserved(*status, path))
            .collect())
    }

    fn is_preserved(&self, status: Status, path: &str) -> bool {
        match &self.preserved {
            Some(dir) => status.contains(Status::WT_NEW) && Path::new(path).starts_with(dir),
            None => false,
        }
    }
}

impl Vcs for GitRepo {
    fn current_branch_or_tag(&self) -> CoreResult<String> {
        let head = self.repo.head()?;
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(name.to_string());
            }
        }

        // Detached HEAD: accept a tag pointing exactly at it
        let head_id = head.peel_to_commit()?.id();
        let tags = self.repo.tag_names(None)?;
        for name in tags.iter().flatten() {
            let target = self
                .repo
                .revparse_single(&format!("refs/tags/{}", name))
                .and_then(|obj| obj.peel_to_commit());
            if matches!(target, Ok(commit) if commit.id() == head_id) {
                return Ok(name.to_string());
            }
        }

        Err(CoreError::Git(git2::Error::from_str(
            "HEAD is detached and not at a tag; check out a branch or tag before replaying history",
        )))
    }

    fn status_changes(&self) -> CoreResult<Vec<String>> {
        Ok(self
            .statuses()?
            .into_iter()
            .map(|(status, path)| format!("{}: {}", status_kind(status), path))
            .collect())
    }

    fn clean(&self) -> CoreResult<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo
            .reset(head.as_object(), ResetType::Hard, None)?;

        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| git2::Error::from_str("repository has no working directory"))?
            .to_path_buf();
        for (status, path) in self.statuses()? {
            if !status.contains(Status::WT_NEW) {
                continue;
            }
            let full = workdir.join(&path);
            debug!("Removing untracked {}", full.display());
            if full.is_dir() {
                std::fs::remove_dir_all(&full)?;
            } else {
                std::fs::remove_file(&full)?;
            }
        }
        Ok(())
    }

    fn checkout(&self, rev: &str) -> CoreResult<()> {
        let target = self.repo.revparse_single(rev)?;
        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;

        match self.repo.find_branch(rev, BranchType::Local) {
            Ok(branch) => {
                let refname = branch
                    .get()
                    .name()
                    .ok_or_else(|| git2::Error::from_str("branch name is not valid UTF-8"))?
                    .to_string();
                self.repo.set_head(&refname)?;
            }
            Err(_) => self.repo.set_head_detached(target.peel_to_commit()?.id())?,
        }
        debug!("Checked out {}", rev);
        Ok(())
    }
}

fn status_kind(status: Status) -> &'static str {
    if status.intersects(Status::WT_NEW) {
        "untracked"
    } else if status.intersects(Status::INDEX_NEW) {
        "added"
    } else if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
        "deleted"
    } else if status.intersects(Status::WT_RENAMED | Status::INDEX_RENAMED) {
        "renamed"
    } else if status.intersects(Status::CONFLICTED) {
        "conflicted"
    } else {
        "modified"
    }
}

fn commit_info(commit: &git2::Commit) -> CommitInfo {
    let hash = commit.id().to_string();
    CommitInfo {
        short_hash: hash.chars().take(12).collect(),
        hash,
        author: commit.author().name().unwrap_or("Unknown").to_string(),
        timestamp: format_git_time(&commit.time()),
        message: commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string(),
    }
}

/// Resolve symlinks where the path exists; a missing tail is kept as given
fn canonical(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => canonical(parent).join(name),
        _ => path.to_path_buf(),
    }
}

/// Format a git timestamp as ISO 8601
fn format_git_time(time: &git2::Time) -> String {
    match Utc.timestamp_opt(time.seconds(), 0).single() {
        Some(dt) => dt.to_rfc3339(),
        None => "1970-01-01T00:00:00Z".to_string(),
    }
}

/// Turn a newest-first log into oldest-first revisions to walk
pub fn prepare_hashes(log: &[CommitInfo]) -> Vec<String> {
    log.iter().rev().map(|c| c.hash.clone()).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Repo with two commits on `main`
    pub(crate) fn create_test_repo() -> anyhow::Result<(tempfile::TempDir, Repository)> {
        let dir = tempdir()?;
        let repo = Repository::init_opts(
            dir.path(),
            git2::RepositoryInitOptions::new().initial_head("main"),
        )?;

        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        commit_file(&repo, dir.path(), "test.txt", "hello", "Initial commit")?;
        commit_file(&repo, dir.path(), "test.txt", "hello world", "Second commit")?;
        Ok((dir, repo))
    }

    pub(crate) fn commit_file(
        repo: &Repository,
        root: &Path,
        file: &str,
        content: &str,
        message: &str,
    ) -> anyhow::Result<git2::Oid> {
        std::fs::write(root.join(file), content)?;
        let mut index = repo.index()?;
        index.add_path(Path::new(file))?;
        index.write()?;
        let tree = repo.find_tree(index.write_tree()?)?;
        let sig = repo.signature()?;
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        Ok(repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?)
    }

    #[test]
    fn test_log_newest_first() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let repo = GitRepo::open(dir.path())?;
        let log = repo.log(10)?;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "Second commit");
        assert_eq!(log[0].short_hash.len(), 12);

        let hashes = prepare_hashes(&log);
        assert_eq!(hashes, vec![log[1].hash.clone(), log[0].hash.clone()]);
        Ok(())
    }

    #[test]
    fn test_latest_commit() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let commit = GitRepo::open(dir.path())?.latest_commit()?;
        assert_eq!(commit.message, "Second commit");
        assert_eq!(commit.author, "Test User");
        Ok(())
    }

    #[test]
    fn test_current_branch_and_detached_checkout() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let repo = GitRepo::open(dir.path())?;
        assert_eq!(repo.current_branch_or_tag()?, "main");

        let first = repo.log(10)?[1].hash.clone();
        repo.safe_checkout(&first, false)?;
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt"))?, "hello");
        assert!(repo.current_branch_or_tag().is_err());

        repo.checkout("main")?;
        assert_eq!(repo.current_branch_or_tag()?, "main");
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt"))?, "hello world");
        Ok(())
    }

    #[test]
    fn test_detached_at_tag() -> anyhow::Result<()> {
        let (dir, raw) = create_test_repo()?;
        let head = raw.head()?.peel_to_commit()?;
        raw.tag_lightweight("v1.0.0", head.as_object(), false)?;

        let repo = GitRepo::open(dir.path())?;
        repo.checkout("v1.0.0")?;
        assert_eq!(repo.current_branch_or_tag()?, "v1.0.0");
        Ok(())
    }

    #[test]
    fn test_dirty_tree_blocks_checkout() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let repo = GitRepo::open(dir.path())?;
        std::fs::write(dir.path().join("test.txt"), "local edit")?;
        std::fs::write(dir.path().join("notes.txt"), "scratch")?;

        let err = repo.safe_checkout("HEAD~1", false).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, CoreError::GitStatus { .. }));
        assert!(msg.contains("modified: test.txt"));
        assert!(msg.contains("untracked: notes.txt"));
        Ok(())
    }

    #[test]
    fn test_preserved_dir_survives_clean() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let repo = GitRepo::open(dir.path())?.preserve_untracked(&dir.path().join(".scorekeep"));
        std::fs::create_dir(dir.path().join(".scorekeep"))?;
        std::fs::write(dir.path().join(".scorekeep").join("abc-report.json"), "{}")?;
        assert!(repo.status_changes()?.is_empty());

        std::fs::write(dir.path().join("notes.txt"), "scratch")?;
        assert_eq!(repo.status_changes()?, vec!["untracked: notes.txt".to_string()]);

        repo.safe_checkout("HEAD~1", true)?;
        assert!(!dir.path().join("notes.txt").exists());
        assert!(dir.path().join(".scorekeep").join("abc-report.json").exists());
        Ok(())
    }

    #[test]
    fn test_force_clean_discards_changes() -> anyhow::Result<()> {
        let (dir, _repo) = create_test_repo()?;
        let repo = GitRepo::open(dir.path())?;
        std::fs::write(dir.path().join("test.txt"), "local edit")?;
        std::fs::create_dir(dir.path().join("scratch"))?;
        std::fs::write(dir.path().join("scratch").join("a.txt"), "a")?;

        repo.safe_checkout("HEAD~1", true)?;
        assert!(!dir.path().join("scratch").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt"))?, "hello");
        Ok(())
    }
}
