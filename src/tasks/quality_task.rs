//! Test suite, linter and type checker

use super::TaskContext;
use crate::core::config::QualityConfig;
use crate::core::error::ReleaseError;
use crate::core::traits::CommandSpec;
use tracing::info;

pub struct QualityTask<'a> {
    ctx: TaskContext<'a>,
    quality: QualityConfig,
}

impl<'a> QualityTask<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self {
            ctx,
            quality: ctx.config.quality(),
        }
    }

    fn module_dir(&self) -> Result<String, ReleaseError> {
        self.ctx
            .config
            .package()
            .module_name()
            .map(|m| format!("{}/", m))
            .ok_or_else(|| ReleaseError::Config("package.name is required".to_string()))
    }

    /// `python -m pytest <tests_dir> -v [--tb=short]`
    pub fn test_command(&self, short_traceback: bool) -> CommandSpec {
        let spec = CommandSpec::new(self.ctx.python()).args([
            "-m",
            "pytest",
            self.quality.tests_dir.as_str(),
            "-v",
        ]);
        if short_traceback {
            spec.arg("--tb=short")
        } else {
            spec
        }
    }

    pub async fn run_tests(&self, short_traceback: bool) -> Result<(), ReleaseError> {
        info!("Running tests...");
        self.ctx
            .runner
            .run_checked("tests", &self.test_command(short_traceback))
            .await?;
        Ok(())
    }

    pub fn lint_command(&self) -> Result<CommandSpec, ReleaseError> {
        let mut spec = CommandSpec::new(self.ctx.python())
            .args(["-m", "flake8"])
            .arg(self.module_dir()?)
            .arg(format!("--max-line-length={}", self.quality.max_line_length));
        if !self.quality.lint_ignore.is_empty() {
            spec = spec.arg(format!("--extend-ignore={}", self.quality.lint_ignore.join(",")));
        }
        Ok(spec)
    }

    /// flake8 over the package directory
    pub async fn lint(&self) -> Result<(), ReleaseError> {
        self.ctx.runner.run_checked("lint", &self.lint_command()?).await?;
        Ok(())
    }

    pub async fn type_check(&self) -> Result<(), ReleaseError> {
        let spec = CommandSpec::new(self.ctx.python())
            .args(["-m", "mypy"])
            .arg(self.module_dir()?)
            .arg("--ignore-missing-imports");
        self.ctx.runner.run_checked("type check", &spec).await?;
        Ok(())
    }

    pub fn lint_enabled(&self) -> bool {
        self.quality.lint
    }

    pub fn type_check_enabled(&self) -> bool {
        self.quality.type_check
    }
}
