//! Manifest Validator - required files and version literals
//!
//! Reads `pyproject.toml` (PEP 621 `[project]` or `[tool.poetry]`) and the
//! `__version__` assignment of the package init file, and checks both against
//! the configured release version.
//!
//! # Example
//!
//! ```no_run
//! use pyship::validation::ManifestValidator;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), pyship::core::ReleaseError> {
//! let validator = ManifestValidator::new();
//! let metadata = validator.read_pyproject(Path::new(".")).await?;
//! if let Some(metadata) = metadata {
//!     println!("{} {}", metadata.name, metadata.version.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

use crate::core::error::ReleaseError;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};

lazy_static! {
    static ref INIT_VERSION_REGEX: Regex =
        Regex::new(r#"(?m)^__version__\s*=\s*["']([^"']+)["']"#).unwrap();
}

pub const PYPROJECT: &str = "pyproject.toml";

/// Metadata extracted from pyproject.toml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMetadata {
    pub name: String,
    /// `None` when the version is dynamic
    pub version: Option<String>,
}

/// Validator for package manifest files
pub struct ManifestValidator;

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self
    }

    /// Missing entries of `files`, in order
    pub fn missing_files(&self, root: &Path, files: &[String]) -> Vec<PathBuf> {
        files
            .iter()
            .map(PathBuf::from)
            .filter(|file| !root.join(file).exists())
            .collect()
    }

    /// Fail on the first required file that does not exist
    pub fn check_required_files(&self, root: &Path, files: &[String]) -> Result<(), ReleaseError> {
        match self.missing_files(root, files).into_iter().next() {
            Some(path) => {
                error!("Missing required file: {}", path.display());
                Err(ReleaseError::MissingFile { path })
            }
            None => {
                debug!("All {} required files present", files.len());
                Ok(())
            }
        }
    }

    /// Parse pyproject.toml, `Ok(None)` when the file does not exist
    pub async fn read_pyproject(
        &self,
        root: &Path,
    ) -> Result<Option<ManifestMetadata>, ReleaseError> {
        let path = root.join(PYPROJECT);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ReleaseError::io(format!("failed to read {}", path.display()), e))?;

        Self::parse_pyproject(&content).map(Some)
    }

    fn parse_pyproject(content: &str) -> Result<ManifestMetadata, ReleaseError> {
        let parsed: toml::Value = toml::from_str(content)
            .map_err(|e| ReleaseError::Config(format!("invalid {}: {}", PYPROJECT, e)))?;

        let table = parsed
            .get("project")
            .or_else(|| parsed.get("tool").and_then(|t| t.get("poetry")))
            .ok_or_else(|| {
                ReleaseError::Config(format!("{} has no [project] table", PYPROJECT))
            })?;

        let text = |key: &str| table.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let name = text("name")
            .ok_or_else(|| ReleaseError::Config(format!("{} is missing a name", PYPROJECT)))?;

        Ok(ManifestMetadata {
            name,
            version: text("version"),
        })
    }

    /// `__version__` declared in the package init file
    pub async fn read_init_version(&self, path: &Path) -> Result<Option<String>, ReleaseError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ReleaseError::io(format!("failed to read {}", path.display()), e))?;

        Ok(INIT_VERSION_REGEX
            .captures(&content)
            .map(|caps| caps[1].to_string()))
    }

    /// Both the init file and pyproject.toml must declare `expected`
    pub async fn check_version_consistency(
        &self,
        root: &Path,
        init_file: &str,
        expected: &str,
    ) -> Result<(), ReleaseError> {
        let found = self.read_init_version(&root.join(init_file)).await?;
        if found.as_deref() != Some(expected) {
            error!("Version mismatch in {}", init_file);
            return Err(ReleaseError::VersionMismatch {
                file: PathBuf::from(init_file),
                expected: expected.to_string(),
                found,
            });
        }

        let found = self
            .read_pyproject(root)
            .await?
            .and_then(|metadata| metadata.version);
        if found.as_deref() != Some(expected) {
            error!("Version mismatch in {}", PYPROJECT);
            return Err(ReleaseError::VersionMismatch {
                file: PathBuf::from(PYPROJECT),
                expected: expected.to_string(),
                found,
            });
        }

        debug!("Version {} consistent", expected);
        Ok(())
    }
}
