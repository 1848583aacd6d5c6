//! Plugin runners
//!
//! A plugin produces its audits through exactly one [`Runner`]:
//!
//! - [`Runner::Command`] spawns an external process and reads the audit
//!   outputs it writes to `outputFile`
//! - [`Runner::Function`] calls an in-process function, either a registered
//!   built-in (see [`builtin`]) or one supplied by a library caller
//!
//! Whatever the variant, the outputs are validated and checked against the
//! audits the plugin declares before they are returned.

pub mod builtin;
mod command;
mod validation;

pub use command::{run_command, CommandOutput};
pub use validation::{check_audit_output, validate_audit_outputs};

use crate::config::PluginConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::AuditOutput;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Post-processing applied to a command's parsed output before validation
pub type OutputTransform = Arc<dyn Fn(JsonValue) -> anyhow::Result<JsonValue> + Send + Sync>;

/// In-process runner body; the argument is a progress ("next") observer
pub type RunnerFn =
    Arc<dyn Fn(&dyn Fn(&str)) -> anyhow::Result<Vec<AuditOutput>> + Send + Sync>;

/// Runs an external command and reads the audits from a JSON file
#[derive(Clone)]
pub struct CommandRunner {
    pub command: String,
    pub args: Vec<String>,
    /// JSON file the command writes; relative paths resolve against `cwd`
    pub output_file: PathBuf,
    pub cwd: Option<PathBuf>,
    pub transform: Option<OutputTransform>,
}

impl CommandRunner {
    pub fn new(command: impl Into<String>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            output_file: output_file.into(),
            cwd: None,
            transform: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(JsonValue) -> anyhow::Result<JsonValue> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    fn output_path(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) if self.output_file.is_relative() => cwd.join(&self.output_file),
            _ => self.output_file.clone(),
        }
    }

    fn run(&self) -> anyhow::Result<Vec<AuditOutput>> {
        use anyhow::Context;

        let output = run_command(&self.command, &self.args, self.cwd.as_deref())?;
        if !output.success() {
            anyhow::bail!(
                "`{}` exited with code {}{}",
                self.command,
                output
                    .return_code
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                output.stderr_tail()
            );
        }

        let path = self.output_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read output file {}", path.display()))?;
        let mut json: JsonValue = serde_json::from_str(&content)
            .with_context(|| format!("Output file {} is not valid JSON", path.display()))?;

        if let Some(transform) = &self.transform {
            json = transform(json).context("Output transform failed")?;
        }

        serde_json::from_value(json)
            .with_context(|| format!("Output file {} is not a list of audit outputs", path.display()))
    }
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("output_file", &self.output_file)
            .field("cwd", &self.cwd)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Calls an in-process function
#[derive(Clone)]
pub struct FunctionRunner {
    /// Built-in name, or a label for library-supplied functions
    pub name: String,
    /// Options passed to a built-in; kept so the config round-trips
    pub options: JsonValue,
    /// `None` when `name` does not resolve to anything callable
    pub call: Option<RunnerFn>,
}

impl FunctionRunner {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&dyn Fn(&str)) -> anyhow::Result<Vec<AuditOutput>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            options: JsonValue::Null,
            call: Some(Arc::new(call)),
        }
    }

    /// Resolve a built-in by name; unknown names produce a runner without a callable
    pub fn builtin(name: impl Into<String>, options: JsonValue) -> Self {
        let name = name.into();
        let call = builtin::resolve(&name, &options);
        Self { name, options, call }
    }
}

impl fmt::Debug for FunctionRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRunner")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("callable", &self.call.is_some())
            .finish()
    }
}

/// How a plugin produces its audits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RunnerDef", into = "RunnerDef")]
pub enum Runner {
    Command(CommandRunner),
    Function(FunctionRunner),
}

/// On-disk shape of a runner
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RunnerDef {
    #[serde(rename_all = "camelCase")]
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(alias = "output_file")]
        output_file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    Builtin {
        builtin: String,
        #[serde(default, skip_serializing_if = "JsonValue::is_null")]
        options: JsonValue,
    },
}

impl From<RunnerDef> for Runner {
    fn from(def: RunnerDef) -> Self {
        match def {
            RunnerDef::Command {
                command,
                args,
                output_file,
                cwd,
            } => Runner::Command(CommandRunner {
                command,
                args,
                output_file,
                cwd,
                transform: None,
            }),
            RunnerDef::Builtin { builtin, options } => {
                Runner::Function(FunctionRunner::builtin(builtin, options))
            }
        }
    }
}

impl From<Runner> for RunnerDef {
    fn from(runner: Runner) -> Self {
        match runner {
            Runner::Command(c) => RunnerDef::Command {
                command: c.command,
                args: c.args,
                output_file: c.output_file,
                cwd: c.cwd,
            },
            Runner::Function(f) => RunnerDef::Builtin {
                builtin: f.name,
                options: f.options,
            },
        }
    }
}

/// Timing and audits of one runner execution
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerResult {
    /// Start time, RFC 3339
    pub date: String,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
    pub audits: Vec<AuditOutput>,
}

/// Execute one plugin's runner and validate what it returns
///
/// `observer` receives progress messages from function runners.
pub fn execute_plugin(plugin: &PluginConfig, observer: &dyn Fn(&str)) -> CoreResult<RunnerResult> {
    let date = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let start = Instant::now();

    let audits = match &plugin.runner {
        Runner::Command(runner) => {
            debug!("Running plugin {} via `{}`", plugin.slug, runner.command);
            runner.run()
        }
        Runner::Function(runner) => {
            debug!("Running plugin {} via function {}", plugin.slug, runner.name);
            match &runner.call {
                Some(call) => call(observer),
                None => Err(anyhow::anyhow!("runner `{}` is not a function", runner.name)),
            }
        }
    }
    .map_err(|e| CoreError::runner(&plugin.slug, format!("{:#}", e)))?;

    validate_audit_outputs(plugin, &audits).map_err(|e| CoreError::runner(&plugin.slug, e))?;

    Ok(RunnerResult {
        date,
        duration: start.elapsed().as_millis() as u64,
        audits,
    })
}
