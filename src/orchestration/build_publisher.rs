//! Build Publisher - build, check and upload a distribution
//!
//! Sequence: clean → install build dependencies → tests → build →
//! `twine check` → upload. Every step is hard.

use crate::core::error::ReleaseError;
use crate::core::report::{PipelineReport, StepRecorder};
use crate::security::token_manager::SecureTokenManager;
use crate::tasks::{CleanupTask, IndexTarget, PypiTask, QualityTask, TaskContext};
use tracing::info;

/// Flags of the build pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Upload to Test PyPI instead of PyPI
    pub test: bool,
    pub skip_tests: bool,
    pub skip_clean: bool,
}

pub struct BuildPublisher<'a> {
    ctx: TaskContext<'a>,
    pypi: PypiTask<'a>,
}

impl<'a> BuildPublisher<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self::with_tokens(ctx, SecureTokenManager::from_env())
    }

    pub fn with_tokens(ctx: TaskContext<'a>, tokens: SecureTokenManager) -> Self {
        Self {
            ctx,
            pypi: PypiTask::with_tokens(ctx, tokens),
        }
    }

    pub(crate) fn pypi(&self) -> &PypiTask<'a> {
        &self.pypi
    }

    pub async fn run(&self, options: &BuildOptions) -> PipelineReport {
        let mut recorder = StepRecorder::new("build");
        let outcome = self.execute(options, &mut recorder).await;
        recorder.finish(outcome)
    }

    pub(crate) async fn execute(
        &self,
        options: &BuildOptions,
        recorder: &mut StepRecorder,
    ) -> Result<(), ReleaseError> {
        info!("Starting build and publish process...");

        if options.skip_clean {
            recorder.skipped("clean", "--skip-clean");
        } else {
            recorder
                .hard("clean", CleanupTask::new(self.ctx).clean())
                .await?;
        }

        recorder
            .hard("install build dependencies", self.pypi.install_build_dependencies())
            .await?;

        if options.skip_tests {
            recorder.skipped("tests", "--skip-tests");
        } else {
            recorder
                .hard("tests", QualityTask::new(self.ctx).run_tests(false))
                .await?;
        }

        recorder.hard("build", self.pypi.build()).await?;
        recorder.hard("check", self.pypi.check()).await?;

        let target = IndexTarget::from_test_flag(options.test);
        recorder.hard("upload", self.pypi.upload(target)).await?;

        let name = self.ctx.config.package().name.unwrap_or_default();
        info!("Package successfully published to {}!", target.label());
        info!(
            "Install with: {}",
            target.install_hint(&self.ctx.config.verify(), &name)
        );
        info!("Build and publish process completed successfully!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PackageConfig, ShipConfig};
    use crate::core::report::StepStatus;
    use crate::test_support::ScriptedRunner;
    use tempfile::TempDir;

    fn config() -> ShipConfig {
        ShipConfig {
            package: Some(PackageConfig {
                name: Some("demo-pkg".to_string()),
                version: Some("1.0.0".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// A project whose `python -m build` already left artifacts behind
    fn built_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("dist/demo_pkg-1.0.0.tar.gz"), b"").unwrap();
        dir
    }

    fn publisher<'a>(
        runner: &'a ScriptedRunner,
        dir: &'a TempDir,
        config: &'a ShipConfig,
    ) -> BuildPublisher<'a> {
        BuildPublisher::with_tokens(
            TaskContext::new(runner, dir.path(), config),
            SecureTokenManager::default(),
        )
    }

    #[tokio::test]
    async fn test_full_sequence() {
        let dir = built_project();
        let runner = ScriptedRunner::new();
        let config = config();
        let options = BuildOptions {
            skip_clean: true,
            ..Default::default()
        };

        let report = publisher(&runner, &dir, &config).run(&options).await;

        assert!(report.success, "{:?}", report.error);
        assert_eq!(report.status_of("clean"), Some(StepStatus::Skipped));
        assert_eq!(
            runner.lines(),
            vec![
                "python -m pip install build",
                "python -m pip install twine",
                "python -m pip install wheel",
                "python -m pytest tests/ -v",
                "python -m build",
                "python -m twine check dist/demo_pkg-1.0.0.tar.gz",
                "python -m twine upload dist/demo_pkg-1.0.0.tar.gz",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_tests_stop_before_build() {
        let dir = built_project();
        let runner = ScriptedRunner::new().fail("python", &["-m", "pytest"], "1 failed");
        let config = config();
        let options = BuildOptions {
            skip_clean: true,
            ..Default::default()
        };

        let report = publisher(&runner, &dir, &config).run(&options).await;

        assert!(!report.success);
        assert_eq!(report.status_of("tests"), Some(StepStatus::Failed));
        assert!(report.step("build").is_none());
        assert!(!runner.ran("python", &["-m", "build"]));
        assert!(!runner.ran("python", &["-m", "twine"]));
    }

    #[tokio::test]
    async fn test_test_index_and_skip_flags() {
        let dir = built_project();
        let runner = ScriptedRunner::new();
        let config = config();
        let options = BuildOptions {
            test: true,
            skip_tests: true,
            skip_clean: true,
        };

        let report = publisher(&runner, &dir, &config).run(&options).await;

        assert!(report.success);
        assert_eq!(report.status_of("tests"), Some(StepStatus::Skipped));
        assert!(!runner.ran("python", &["-m", "pytest"]));
        assert!(runner.ran(
            "python",
            &["-m", "twine", "upload", "--repository", "testpypi"]
        ));
    }

    #[tokio::test]
    async fn test_clean_then_empty_dist_fails_check() {
        // Nothing rebuilds dist/ because the build command is scripted
        let dir = built_project();
        let runner = ScriptedRunner::new();
        let config = config();

        let report = publisher(&runner, &dir, &config)
            .run(&BuildOptions::default())
            .await;

        assert!(!report.success);
        assert_eq!(report.status_of("clean"), Some(StepStatus::Passed));
        assert_eq!(report.status_of("check"), Some(StepStatus::Failed));
        assert_eq!(report.error_code.as_deref(), Some("EMPTY_DIST"));
        assert!(!runner.ran("python", &["-m", "twine"]));
    }
}
