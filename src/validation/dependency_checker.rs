//! Dependency Checker - makes sure the build tools are importable
//!
//! Each build dependency is checked with `python -c "import <dep>"` and
//! installed with pip when the import fails.
//!
//! # Example
//!
//! ```no_run
//! use pyship::security::SafeCommandExecutor;
//! use pyship::validation::DependencyChecker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = SafeCommandExecutor::new(".")?;
//! let checker = DependencyChecker::new(&executor, "python");
//! let result = checker.ensure(&["build".to_string(), "twine".to_string()]).await?;
//!
//! println!("Installed {} packages", result.installed.len());
//! # Ok(())
//! # }
//! ```

use crate::core::error::ReleaseError;
use crate::core::traits::{CommandRunner, CommandSpec};
use tracing::info;

/// Result of a dependency check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyCheckResult {
    /// Already importable
    pub present: Vec<String>,
    /// Installed by this check
    pub installed: Vec<String>,
}

/// Checks and installs Python build dependencies
pub struct DependencyChecker<'a> {
    runner: &'a dyn CommandRunner,
    python: String,
}

impl<'a> DependencyChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, python: impl Into<String>) -> Self {
        Self {
            runner,
            python: python.into(),
        }
    }

    /// Module name used for the import check
    fn import_name(dependency: &str) -> String {
        dependency.replace('-', "_").to_lowercase()
    }

    pub async fn is_importable(&self, dependency: &str) -> Result<bool, ReleaseError> {
        let spec = CommandSpec::new(&self.python)
            .arg("-c")
            .arg(format!("import {}", Self::import_name(dependency)));
        Ok(self.runner.run_logged("dependencies", &spec).await?.success())
    }

    /// Import each dependency, installing the ones that are missing
    ///
    /// A failed install is a hard error.
    pub async fn ensure(
        &self,
        dependencies: &[String],
    ) -> Result<DependencyCheckResult, ReleaseError> {
        let mut result = DependencyCheckResult::default();

        for dependency in dependencies {
            if self.is_importable(dependency).await? {
                result.present.push(dependency.clone());
                continue;
            }

            info!("Installing {}...", dependency);
            let spec = CommandSpec::new(&self.python)
                .args(["-m", "pip", "install", dependency.as_str()]);
            self.runner.run_checked("dependencies", &spec).await?;
            result.installed.push(dependency.clone());
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    fn deps() -> Vec<String> {
        vec!["build".into(), "twine".into(), "wheel".into()]
    }

    #[tokio::test]
    async fn test_all_present() {
        let runner = ScriptedRunner::new();
        let checker = DependencyChecker::new(&runner, "python");

        let result = checker.ensure(&deps()).await.unwrap();

        assert_eq!(result.present, deps());
        assert!(result.installed.is_empty());
        assert!(!runner.ran("python", &["-m", "pip"]));
    }

    #[tokio::test]
    async fn test_missing_dependency_is_installed() {
        let runner =
            ScriptedRunner::new().fail("python", &["-c", "import twine"], "ModuleNotFoundError");
        let checker = DependencyChecker::new(&runner, "python");

        let result = checker.ensure(&deps()).await.unwrap();

        assert_eq!(result.installed, vec!["twine".to_string()]);
        assert!(runner.ran("python", &["-m", "pip", "install", "twine"]));
        assert!(!runner.ran("python", &["-m", "pip", "install", "build"]));
    }

    #[tokio::test]
    async fn test_failed_install_is_fatal() {
        let runner = ScriptedRunner::new()
            .fail("python", &["-c", "import wheel"], "ModuleNotFoundError")
            .fail("python", &["-m", "pip", "install", "wheel"], "network unreachable");
        let checker = DependencyChecker::new(&runner, "python");

        let result = checker.ensure(&deps()).await;
        assert!(matches!(result, Err(ReleaseError::CommandFailed { .. })));
    }

    #[test]
    fn test_import_name() {
        assert_eq!(DependencyChecker::import_name("build"), "build");
        assert_eq!(DependencyChecker::import_name("typing-extensions"), "typing_extensions");
    }
}
