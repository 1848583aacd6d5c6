//! Subprocess execution for command runners
//!
//! There is no timeout here: a runner process runs until it exits. Callers
//! that need a deadline impose it from outside.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Lines of stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// Result from running an external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub return_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.return_code == Some(0)
    }

    /// Last lines of stderr, prefixed with a newline, or empty
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        if lines.is_empty() {
            return String::new();
        }
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        format!("\n{}", lines[start..].join("\n"))
    }
}

/// Spawn `program` with `args` and wait for it to exit
///
/// A program that cannot be found is an error; a non-zero exit is not, the
/// caller decides what that means.
pub fn run_command(program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
    debug!("Running {} {:?}", program, args);

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("{} not found. Please install it first.", program)
        } else {
            anyhow::anyhow!("Failed to run {}: {}", program, e)
        }
    })?;

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for {}", program))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        return_code: output.status.code(),
    })
}
