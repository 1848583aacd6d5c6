//! Pull request comment reconciliation
//!
//! Keeps at most one scorekeep comment per review thread. The comment is
//! recognized by a hidden marker at the end of its body: if one exists it is
//! updated, otherwise a new one is created.

use crate::logging::Logger;
use anyhow::{Context, Result};
use std::path::Path;

/// Hidden marker identifying comments written by scorekeep
pub const COMMENT_MARKER: &str = "<!-- generated by scorekeep -->";

/// Visible notice appended to truncated comments
pub const TRUNCATION_NOTICE: &str = "...*[Comment body truncated]*";

pub type CommentId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub body: String,
    pub url: String,
}

/// Review-thread API of a code hosting provider
pub trait ProviderApiClient {
    /// Longest body the provider accepts, in characters
    fn max_comment_chars(&self) -> usize;
    fn list_comments(&self) -> Result<Vec<Comment>>;
    fn create_comment(&self, body: &str) -> Result<Comment>;
    fn update_comment(&self, id: CommentId, body: &str) -> Result<Comment>;
}

/// Create or update the scorekeep comment with `diff`
///
/// Returns the id of the comment that now holds the diff. Provider errors are
/// propagated.
pub fn comment_on_pr(diff: &str, api: &dyn ProviderApiClient, logger: &dyn Logger) -> Result<CommentId> {
    let body = comment_body(diff, api.max_comment_chars(), logger);

    let comments = api.list_comments().context("Failed to list comments")?;
    let existing = comments.iter().find(|c| c.body.contains(COMMENT_MARKER));

    let comment = match existing {
        Some(previous) => {
            logger.debug(&format!("Updating comment {}", previous.url));
            api.update_comment(previous.id, &body)
                .with_context(|| format!("Failed to update comment {}", previous.id))?
        }
        None => {
            logger.debug("Creating new comment");
            api.create_comment(&body).context("Failed to create comment")?
        }
    };

    logger.info(&format!("Comment posted: {}", comment.url));
    Ok(comment.id)
}

/// Like [`comment_on_pr`], reading the diff from a file
pub fn comment_on_pr_from_file(
    path: &Path,
    api: &dyn ProviderApiClient,
    logger: &dyn Logger,
) -> Result<CommentId> {
    let diff = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diff {}", path.display()))?;
    comment_on_pr(&diff, api, logger)
}

/// Diff plus marker, truncated to `max_chars` characters if needed
fn comment_body(diff: &str, max_chars: usize, logger: &dyn Logger) -> String {
    let suffix = format!("\n\n{}\n", COMMENT_MARKER);
    let full_len = diff.chars().count() + suffix.chars().count();
    if full_len <= max_chars {
        return format!("{}{}", diff, suffix);
    }

    logger.warn(&format!(
        "Comment body is too long. Truncating to {} characters.",
        max_chars
    ));
    let truncated_suffix = format!("{}{}", TRUNCATION_NOTICE, suffix);
    let suffix_len = truncated_suffix.chars().count();
    if suffix_len > max_chars {
        // No room for diff text; the marker alone still identifies the comment
        return COMMENT_MARKER.chars().take(max_chars).collect();
    }
    let kept: String = diff.chars().take(max_chars - suffix_len).collect();
    format!("{}{}", kept, truncated_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};
    use std::cell::RefCell;

    const DIFF: &str = "# Scorekeep comparison\n\nNo changes to report.\n";

    #[derive(Default)]
    struct FakeApi {
        max_chars: usize,
        comments: RefCell<Vec<Comment>>,
        created: RefCell<Vec<String>>,
        updated: RefCell<Vec<(CommentId, String)>>,
        fail_list: bool,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                max_chars: 1_000_000,
                ..Default::default()
            }
        }
    }

    impl ProviderApiClient for FakeApi {
        fn max_comment_chars(&self) -> usize {
            self.max_chars
        }

        fn list_comments(&self) -> Result<Vec<Comment>> {
            if self.fail_list {
                anyhow::bail!("401 Unauthorized");
            }
            Ok(self.comments.borrow().clone())
        }

        fn create_comment(&self, body: &str) -> Result<Comment> {
            self.created.borrow_mut().push(body.to_string());
            let comment = Comment {
                id: 42,
                body: body.to_string(),
                url: "https://fake.git.repo/comments/42".into(),
            };
            self.comments.borrow_mut().push(comment.clone());
            Ok(comment)
        }

        fn update_comment(&self, id: CommentId, body: &str) -> Result<Comment> {
            self.updated.borrow_mut().push((id, body.to_string()));
            let mut comments = self.comments.borrow_mut();
            let comment = comments
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow::anyhow!("404"))?;
            comment.body = body.to_string();
            Ok(comment.clone())
        }
    }

    fn other_comment() -> Comment {
        Comment {
            id: 666,
            body: "LGTM!".into(),
            url: "https://fake.git.repo/comments/666".into(),
        }
    }

    #[test]
    fn test_creates_comment_when_none_matches() {
        let api = FakeApi::new();
        api.comments.borrow_mut().push(other_comment());
        let logger = MemoryLogger::default();

        let id = comment_on_pr(DIFF, &api, &logger).expect("comment");
        assert_eq!(id, 42);
        assert_eq!(
            api.created.borrow().as_slice(),
            [format!("{}\n\n{}\n", DIFF, COMMENT_MARKER)]
        );
        assert!(api.updated.borrow().is_empty());
    }

    #[test]
    fn test_second_run_updates_instead_of_creating() {
        let api = FakeApi::new();
        api.comments.borrow_mut().push(other_comment());
        let logger = MemoryLogger::default();

        comment_on_pr(DIFF, &api, &logger).expect("first");
        let id = comment_on_pr("# changed\n", &api, &logger).expect("second");

        assert_eq!(id, 42);
        assert_eq!(api.created.borrow().len(), 1);
        assert_eq!(api.updated.borrow().len(), 1);
        assert_eq!(api.updated.borrow()[0].0, 42);
        assert_eq!(api.comments.borrow().len(), 2);
    }

    #[test]
    fn test_truncates_long_body() {
        let api = FakeApi {
            max_chars: 200,
            ..FakeApi::new()
        };
        let logger = MemoryLogger::default();
        let long_diff: String = (0..1000).map(|i| format!("- Audit #{} failed\n", i)).collect();

        comment_on_pr(&long_diff, &api, &logger).expect("comment");

        let body = api.created.borrow()[0].clone();
        assert!(body.chars().count() <= 200);
        assert!(body.contains(TRUNCATION_NOTICE));
        assert!(body.ends_with(&format!("{}\n", COMMENT_MARKER)));
        assert_eq!(
            logger.messages(LogLevel::Warn),
            vec!["Comment body is too long. Truncating to 200 characters.".to_string()]
        );
    }

    #[test]
    fn test_truncation_is_char_safe() {
        let logger = MemoryLogger::default();
        let body = comment_body(&"ü".repeat(500), 120, &logger);
        assert!(body.chars().count() <= 120);
        assert!(body.starts_with('ü'));
    }

    #[test]
    fn test_tiny_limit_still_bounds_body() {
        let logger = MemoryLogger::default();
        let body = comment_body(&"x".repeat(500), 40, &logger);
        assert_eq!(body, COMMENT_MARKER);

        let body = comment_body(&"x".repeat(500), 10, &logger);
        assert_eq!(body.chars().count(), 10);
        assert_eq!(logger.messages(LogLevel::Warn).len(), 2);
    }

    #[test]
    fn test_provider_errors_propagate() {
        let api = FakeApi {
            fail_list: true,
            ..FakeApi::new()
        };
        let logger = MemoryLogger::default();
        let err = comment_on_pr(DIFF, &api, &logger).unwrap_err();
        assert!(format!("{:#}", err).contains("401 Unauthorized"));
    }

    #[test]
    fn test_comment_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report-diff.md");
        std::fs::write(&path, DIFF).expect("write diff");
        let api = FakeApi::new();
        let logger = MemoryLogger::default();

        assert_eq!(comment_on_pr_from_file(&path, &api, &logger).expect("comment"), 42);
        assert!(comment_on_pr_from_file(&dir.path().join("missing.md"), &api, &logger).is_err());
    }
}
