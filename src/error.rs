//! Error taxonomy for the collection pipeline
//!
//! Configuration and user-input errors are reported before any I/O where
//! possible. Runner failures abort the whole collection. `Persist` is the only
//! variant that callers are expected to aggregate instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the core pipeline
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("BAD_USER_INPUT {0}")]
    UserInput(String),

    #[error("Plugin {plugin} failed to run: {cause}")]
    RunnerExecution { plugin: String, cause: String },

    #[error("No plugins configured, nothing to collect")]
    NoPlugins,

    #[error("outputDir: {} is no directory: {source}", path.display())]
    PersistDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fileName: {} could not be saved: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    #[error(
        "Working directory needs to be clean before you can proceed. \
         Commit your local changes or stash them:\n{}",
        changes.join("\n")
    )]
    GitStatus { changes: Vec<String> },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Build a runner error from any displayable cause, keeping the whole chain
    pub fn runner(plugin: &str, cause: impl std::fmt::Display) -> Self {
        CoreError::RunnerExecution {
            plugin: plugin.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Whether this error is fatal for a whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CoreError::Persist { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
