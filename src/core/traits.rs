//! Core traits and types for running external tools
//!
//! Every release step is an external command followed by an exit-code check.
//! [`CommandRunner`] is the seam between the steps and the operating system:
//! the CLI plugs in [`SafeCommandExecutor`](crate::security::SafeCommandExecutor)
//! or [`DryRunExecutor`](crate::security::DryRunExecutor), tests plug in a
//! scripted runner.

use crate::core::error::ReleaseError;
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use secrecy::SecretString;
use std::fmt;
use tracing::{debug, error, info};

// ============================================================================
// Command description
// ============================================================================

/// An external command: program, arguments, optional stdin and environment
#[derive(Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub envs: Vec<(String, SecretString)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pipe `input` to the child's stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: SecretString) -> Self {
        self.envs.push((key.into(), value));
        self
    }

    /// True when the command is `program` followed by `prefix`
    pub fn starts_with(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

/// Shell-like rendering for logs. Environment values are never printed.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

// ============================================================================
// Runner trait
// ============================================================================

/// Executes external commands on behalf of release steps
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing its output
    ///
    /// A non-zero exit is not an error at this level; only failure to start,
    /// wait for, or time out the process is.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;

    /// Run a command and turn a non-zero exit into [`ReleaseError::CommandFailed`]
    ///
    /// Logs the command, then either its stdout (debug) or its stderr (error).
    async fn run_checked(
        &self,
        step: &str,
        spec: &CommandSpec,
    ) -> Result<CommandOutput, ReleaseError> {
        let output = self.run_logged(step, spec).await?;
        if !output.success() {
            return Err(ReleaseError::CommandFailed {
                step: step.to_string(),
                command: spec.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run a command and log the outcome, returning the output either way
    async fn run_logged(
        &self,
        step: &str,
        spec: &CommandSpec,
    ) -> Result<CommandOutput, ReleaseError> {
        info!("Running: {}", spec);
        let output = self
            .run(spec)
            .await
            .map_err(|source| ReleaseError::Command {
                step: step.to_string(),
                source,
            })?;

        if output.success() {
            debug!("Success: {}", output.stdout.trim());
        } else {
            error!("Command failed: {}", spec);
            error!("Error: {}", output.stderr.trim());
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("git").args(["commit", "-m", "Initial commit"]);
        assert_eq!(spec.to_string(), r#"git commit -m "Initial commit""#);
    }

    #[test]
    fn test_display_hides_environment() {
        let spec = CommandSpec::new("python")
            .args(["-m", "twine", "upload"])
            .env("TWINE_PASSWORD", SecretString::new("pypi-secret-token".into()));

        let rendered = spec.to_string();
        assert_eq!(rendered, "python -m twine upload");
        assert!(!format!("{:?}", spec).contains("pypi-secret-token"));
    }

    #[test]
    fn test_starts_with() {
        let spec = CommandSpec::new("gh").args(["auth", "status"]);
        assert!(spec.starts_with("gh", &["auth"]));
        assert!(spec.starts_with("gh", &[]));
        assert!(!spec.starts_with("git", &["auth"]));
        assert!(!spec.starts_with("gh", &["auth", "status", "--extra"]));
    }

    #[test]
    fn test_command_output_helpers() {
        assert!(CommandOutput::ok("done").success());
        assert!(!CommandOutput::failed(1, "boom").success());
        assert!(!CommandOutput::default().success());
    }

    #[tokio::test]
    async fn test_run_checked_maps_failure() {
        let runner =
            ScriptedRunner::new().fail("python", &["-m", "build"], "no module named build");

        let result = runner
            .run_checked("build", &CommandSpec::new("python").args(["-m", "build"]))
            .await;

        match result {
            Err(ReleaseError::CommandFailed { step, stderr, .. }) => {
                assert_eq!(step, "build");
                assert_eq!(stderr, "no module named build");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_logged_returns_failed_output() {
        let runner = ScriptedRunner::new().fail("gh", &["repo", "create"], "already exists");

        let output = runner
            .run_logged("create repo", &CommandSpec::new("gh").args(["repo", "create", "o/r"]))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.stderr, "already exists");
    }
}
