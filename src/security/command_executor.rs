//! SafeCommandExecutor: whitelisted, shell-free execution of release tools
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: only the interpreter, pip, git and gh can run
//! - **Injection prevention**: arguments are passed as a vector, never through a shell
//! - **Working directory validation**: checked once, on construction
//! - **Timeout control**: hung processes are killed when the timeout expires
//!
//! # Example
//!
//! ```rust,no_run
//! use pyship::core::{CommandRunner, CommandSpec};
//! use pyship::security::SafeCommandExecutor;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut executor = SafeCommandExecutor::new(std::env::temp_dir())?;
//! executor.set_timeout(Duration::from_secs(30));
//!
//! let output = executor.run(&CommandSpec::new("git").arg("--version")).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::core::traits::{CommandOutput, CommandRunner, CommandSpec};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Programs every pipeline may run. The configured interpreter is added on top.
const ALLOWED_COMMANDS: &[&str] = &["python", "python3", "pip", "pip3", "git", "gh"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

/// Runs whitelisted programs in the project directory
#[derive(Debug)]
pub struct SafeCommandExecutor {
    working_dir: PathBuf,
    allowed: Vec<String>,
    timeout: Option<Duration>,
}

impl SafeCommandExecutor {
    /// Create an executor rooted at `working_dir`, which must exist
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            allowed: ALLOWED_COMMANDS.iter().map(|c| c.to_string()).collect(),
            timeout: None,
        })
    }

    /// Allow one more program, typically the configured Python interpreter
    pub fn allow(mut self, program: impl Into<String>) -> Self {
        let program = program.into();
        if !self.allowed.contains(&program) {
            self.allowed.push(program);
        }
        self
    }

    /// Commands exceeding this duration are killed
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allowed.iter().any(|p| p == program)
    }
}

#[async_trait]
impl CommandRunner for SafeCommandExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        if !self.is_allowed(&spec.program) {
            return Err(CommandError::CommandNotAllowed(spec.program.clone()));
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        for (key, value) in &spec.envs {
            command.env(key, value.expose_secret());
        }

        let mut child = command
            .spawn()
            .map_err(|e| CommandError::ExecutionFailed(format!("{}: {}", spec.program, e)))?;

        if let Some(input) = &spec.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;
            // Closing stdin lets the child see EOF
            drop(pipe);
        }

        let waiting = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, waiting)
                .await
                .map_err(|_| CommandError::Timeout(limit))?,
            None => waiting.await,
        }
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Logs commands instead of running them (`--dry-run`)
///
/// Read-only checks (`--version`, `gh auth status`, `python -c "import x"`)
/// still go to the wrapped executor when one is given, so prerequisite
/// checks report the real state of the machine.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    read_only: Option<SafeCommandExecutor>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_only(executor: SafeCommandExecutor) -> Self {
        Self {
            read_only: Some(executor),
        }
    }

    fn is_read_only(spec: &CommandSpec) -> bool {
        spec.args.first().is_some_and(|a| a == "--version")
            || spec.starts_with("gh", &["auth", "status"])
            || (spec.args.first().is_some_and(|a| a == "-c")
                && spec.args.get(1).is_some_and(|a| a.starts_with("import ")))
    }
}

#[async_trait]
impl CommandRunner for DryRunExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        if let Some(executor) = &self.read_only
            && Self::is_read_only(spec)
        {
            debug!("[dry-run] checking: {}", spec);
            return executor.run(spec).await;
        }

        info!("[dry-run] would run: {}", spec);
        if let Some(input) = &spec.stdin {
            debug!("[dry-run] stdin: {}", input);
        }
        Ok(CommandOutput::ok(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> PathBuf {
        std::env::temp_dir()
    }

    #[tokio::test]
    async fn test_rejected_command_rm() {
        let executor = SafeCommandExecutor::new(test_dir()).unwrap();
        let result = executor
            .run(&CommandSpec::new("rm").args(["-rf", "/"]))
            .await;
        assert!(
            matches!(result, Err(CommandError::CommandNotAllowed(_))),
            "rm should be rejected as not in whitelist"
        );
    }

    #[tokio::test]
    async fn test_rejected_shell() {
        let executor = SafeCommandExecutor::new(test_dir()).unwrap();
        let result = executor
            .run(&CommandSpec::new("sh").args(["-c", "echo pwned"]))
            .await;
        assert!(matches!(result, Err(CommandError::CommandNotAllowed(_))));
    }

    #[test]
    fn test_default_whitelist() {
        let executor = SafeCommandExecutor::new(test_dir()).unwrap();
        for program in ["python", "python3", "pip", "git", "gh"] {
            assert!(executor.is_allowed(program), "{} should be allowed", program);
        }
        assert!(!executor.is_allowed("twine"));
        assert!(!executor.is_allowed("curl"));
    }

    #[test]
    fn test_allow_configured_interpreter() {
        let executor = SafeCommandExecutor::new(test_dir())
            .unwrap()
            .allow("python3.12")
            .allow("python3.12");
        assert!(executor.is_allowed("python3.12"));
        assert_eq!(executor.allowed.iter().filter(|p| *p == "python3.12").count(), 1);
    }

    #[test]
    fn test_invalid_working_directory() {
        let result = SafeCommandExecutor::new("/nonexistent/directory/that/does/not/exist");
        assert!(
            matches!(result, Err(CommandError::InvalidWorkingDirectory(_))),
            "Should reject non-existent working directory"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_piped() {
        let executor = SafeCommandExecutor::new(test_dir()).unwrap().allow("cat");
        let output = executor
            .run(&CommandSpec::new("cat").stdin(r#"{"has_wiki": false}"#))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, r#"{"has_wiki": false}"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let executor = SafeCommandExecutor::new(test_dir()).unwrap().allow("false");
        let output = executor.run(&CommandSpec::new("false")).await.unwrap();
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_with_timeout() {
        let mut executor = SafeCommandExecutor::new(test_dir()).unwrap().allow("sleep");
        executor.set_timeout(Duration::from_millis(100));

        let result = executor.run(&CommandSpec::new("sleep").arg("5")).await;
        assert!(matches!(result, Err(CommandError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_execution_failure() {
        let executor = SafeCommandExecutor::new(test_dir())
            .unwrap()
            .allow("pyship-no-such-binary");
        let result = executor
            .run(&CommandSpec::new("pyship-no-such-binary"))
            .await;
        assert!(matches!(result, Err(CommandError::ExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_dry_run_reports_success_without_running() {
        let executor = DryRunExecutor::new();
        let output = executor
            .run(&CommandSpec::new("rm").args(["-rf", "dist"]))
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dry_run_forwards_read_only_commands() {
        // `false` exits 1 whatever its arguments, so a forwarded call is visible
        let inner = SafeCommandExecutor::new(test_dir()).unwrap().allow("false");
        let executor = DryRunExecutor::with_read_only(inner);

        let version = executor
            .run(&CommandSpec::new("false").arg("--version"))
            .await
            .unwrap();
        assert!(!version.success());

        let import = executor
            .run(&CommandSpec::new("false").args(["-c", "import twine"]))
            .await
            .unwrap();
        assert!(!import.success());

        let mutating = executor
            .run(&CommandSpec::new("false").args(["-m", "twine", "upload"]))
            .await
            .unwrap();
        assert!(mutating.success());

        let push = executor
            .run(&CommandSpec::new("git").args(["push", "-u", "origin", "main"]))
            .await
            .unwrap();
        assert!(push.success());
        assert!(push.stdout.is_empty());
    }

    #[test]
    fn test_dry_run_read_only_detection() {
        assert!(DryRunExecutor::is_read_only(&CommandSpec::new("gh").arg("--version")));
        assert!(DryRunExecutor::is_read_only(
            &CommandSpec::new("gh").args(["auth", "status"])
        ));
        assert!(DryRunExecutor::is_read_only(
            &CommandSpec::new("python").args(["-c", "import twine"])
        ));
        assert!(!DryRunExecutor::is_read_only(
            &CommandSpec::new("python").args(["-m", "twine", "upload"])
        ));
    }
}
