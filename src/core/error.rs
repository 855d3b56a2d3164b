//! Error handling for release automation
//!
//! Every step of a pipeline reports failure through [`ReleaseError`]. The
//! variants carry enough context to print recovery guidance; whether a failure
//! stops the pipeline is decided by the step, not by the error.

use crate::security::command_executor::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    // Package validation errors
    #[error("required file missing: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("forbidden content {pattern:?} found in {}:{line}", .file.display())]
    ForbiddenContent {
        file: PathBuf,
        line: usize,
        pattern: String,
    },

    #[error(
        "version mismatch in {}: expected {expected}, found {}",
        .file.display(),
        .found.as_deref().unwrap_or("nothing")
    )]
    VersionMismatch {
        file: PathBuf,
        expected: String,
        found: Option<String>,
    },

    #[error("no distribution files found in {}", .path.display())]
    EmptyDist { path: PathBuf },

    // Prerequisite errors
    #[error("{tool} is not installed")]
    ToolNotInstalled { tool: String },

    #[error("{tool} is not authenticated")]
    NotAuthenticated { tool: String },

    #[error("Python {required} or higher is required (found {found})")]
    InterpreterTooOld { found: String, required: String },

    // External command errors
    #[error("[{step}] command failed: {command}: {stderr}")]
    CommandFailed {
        step: String,
        command: String,
        stderr: String,
    },

    #[error("[{step}] {source}")]
    Command {
        step: String,
        #[source]
        source: CommandError,
    },

    // Post-publish verification
    #[error("verification of {target} failed: {message}")]
    VerificationFailed { target: String, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReleaseError {
    /// Wrap an IO error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::MissingFile { .. } => "MISSING_FILE",
            Self::ForbiddenContent { .. } => "FORBIDDEN_CONTENT",
            Self::VersionMismatch { .. } => "VERSION_MISMATCH",
            Self::EmptyDist { .. } => "EMPTY_DIST",
            Self::ToolNotInstalled { .. } => "TOOL_NOT_INSTALLED",
            Self::NotAuthenticated { .. } => "NOT_AUTHENTICATED",
            Self::InterpreterTooOld { .. } => "INTERPRETER_TOO_OLD",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::Command { .. } => "COMMAND_ERROR",
            Self::VerificationFailed { .. } => "VERIFICATION_FAILED",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(_) => vec![
                "Check .pyship.yaml against `pyship init` output",
                "Run `pyship check` to see all configuration errors",
            ],
            Self::MissingFile { .. } => {
                vec!["Add the missing file or remove it from package.requiredFiles"]
            }
            Self::ForbiddenContent { .. } => vec![
                "Remove the reported characters from the documentation file",
                "Adjust content.forbidden if the pattern is intentional",
            ],
            Self::VersionMismatch { .. } => vec![
                "Bump __version__ and pyproject.toml together",
                "Check package.version in .pyship.yaml",
            ],
            Self::EmptyDist { .. } => vec!["Run the build step before checking or uploading"],
            Self::ToolNotInstalled { .. } => vec!["Install the tool and make sure it is on PATH"],
            Self::NotAuthenticated { .. } => vec!["Run 'gh auth login' first"],
            Self::InterpreterTooOld { .. } => vec![
                "Use a newer interpreter",
                "Point package.python at another executable",
            ],
            Self::CommandFailed { .. } => vec![
                "Check the captured error output above",
                "Re-run the command by hand to reproduce",
            ],
            Self::Command { .. } => vec![
                "Check that the tool is installed",
                "Increase --timeout for slow commands",
            ],
            Self::VerificationFailed { .. } => vec![
                "Package indexes can take a few minutes to update",
                "Check the project page manually",
            ],
            Self::Io { .. } => vec!["Check file permissions in the project directory"],
        }
    }
}
