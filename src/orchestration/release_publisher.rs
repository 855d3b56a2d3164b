//! Release Publisher - the complete publication pipeline
//!
//! Sequence: package validation → prerequisites → test suite → GitHub
//! pipeline → build pipeline → verification → summary report.
//!
//! Validation only reads the project tree, so a broken package fails before
//! any command runs. Prerequisites may install missing build tools.

use super::build_publisher::{BuildOptions, BuildPublisher};
use super::repo_provisioner::{GithubOptions, RepoProvisioner};
use super::summary::{self, PublishedParts};
use crate::core::error::ReleaseError;
use crate::core::report::{PipelineReport, StepRecorder};
use crate::core::traits::CommandSpec;
use crate::security::token_manager::SecureTokenManager;
use crate::tasks::{GitTask, GithubTask, IndexTarget, QualityTask, RepoRef, TaskContext};
use crate::validation::{self, DependencyChecker, VersionValidator};
use tracing::info;

/// Flags of the complete pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    pub skip_tests: bool,
    pub skip_github: bool,
    pub skip_pypi: bool,
    /// Upload to Test PyPI instead of PyPI
    pub test_pypi: bool,
}

impl PublishOptions {
    fn published_parts(&self) -> PublishedParts {
        PublishedParts {
            github: !self.skip_github,
            index: (!self.skip_pypi).then(|| IndexTarget::from_test_flag(self.test_pypi)),
        }
    }
}

pub struct ReleasePublisher<'a> {
    ctx: TaskContext<'a>,
    github: RepoProvisioner<'a>,
    build: BuildPublisher<'a>,
}

impl<'a> ReleasePublisher<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self::with_tokens(ctx, SecureTokenManager::from_env())
    }

    pub fn with_tokens(ctx: TaskContext<'a>, tokens: SecureTokenManager) -> Self {
        Self {
            ctx,
            github: RepoProvisioner::new(ctx),
            build: BuildPublisher::with_tokens(ctx, tokens),
        }
    }

    pub async fn run(&self, options: &PublishOptions) -> PipelineReport {
        let mut recorder = StepRecorder::new("publish");
        let outcome = self.execute(options, &mut recorder).await;
        recorder.finish(outcome)
    }

    async fn execute(
        &self,
        options: &PublishOptions,
        recorder: &mut StepRecorder,
    ) -> Result<(), ReleaseError> {
        let package = self.ctx.config.package();
        let name = package.name.clone().unwrap_or_default();

        info!("{}", "=".repeat(60));
        info!("{} Complete Publication Process", name);
        info!("{}", "=".repeat(60));

        recorder
            .hard(
                "validate package",
                validation::validate_package(self.ctx.root, &package, &self.ctx.config.content()),
            )
            .await?;

        recorder
            .hard("prerequisites", self.check_prerequisites(options))
            .await?;

        if options.skip_tests {
            recorder.skipped("test suite", "--skip-tests");
        } else {
            let quality = QualityTask::new(self.ctx);
            recorder.hard("test suite", quality.run_tests(true)).await?;

            if quality.lint_enabled() {
                recorder.soft("lint", quality.lint()).await;
            } else {
                recorder.skipped("lint", "quality.lint is off");
            }
            if quality.type_check_enabled() {
                recorder.soft("type check", quality.type_check()).await;
            } else {
                recorder.skipped("type check", "quality.typeCheck is off");
            }
            info!("Test suite completed successfully!");
        }

        if options.skip_github {
            recorder.skipped("github", "--skip-github");
        } else {
            self.github
                .execute(&GithubOptions::default(), recorder)
                .await?;
        }

        if options.skip_pypi {
            recorder.skipped("pypi", "--skip-pypi");
        } else {
            // The suite already ran above
            let build_options = BuildOptions {
                test: options.test_pypi,
                skip_tests: true,
                skip_clean: false,
            };
            self.build.execute(&build_options, recorder).await?;
        }

        if options.skip_github && options.skip_pypi {
            recorder.skipped("verify", "nothing was published");
        } else {
            recorder.soft("verify", self.verify(options)).await;
        }

        if self.ctx.dry_run {
            recorder.skipped("summary report", "--dry-run");
        } else {
            let parts = options.published_parts();
            let steps = recorder.steps().to_vec();
            recorder
                .soft(
                    "summary report",
                    summary::write_summary(self.ctx.root, self.ctx.config, parts, &steps),
                )
                .await;
        }

        self.announce(options);
        Ok(())
    }

    /// Interpreter version, git, gh and the build dependencies
    async fn check_prerequisites(&self, options: &PublishOptions) -> Result<(), ReleaseError> {
        info!("Checking prerequisites...");
        let package = self.ctx.config.package();
        let runner = self.ctx.runner;

        let output = runner
            .run_logged("prerequisites", &CommandSpec::new(&package.python).arg("--version"))
            .await
            .map_err(|_| ReleaseError::ToolNotInstalled {
                tool: package.python.clone(),
            })?;
        // Python 2 and some builds print the version on stderr
        let reported = format!("{}{}", output.stdout, output.stderr);

        let validator = VersionValidator::new();
        let found = validator
            .parse_interpreter_version(&reported)
            .filter(|_| output.success())
            .ok_or_else(|| ReleaseError::ToolNotInstalled {
                tool: package.python.clone(),
            })?;
        if !validator.meets_minimum(&found, &package.min_python) {
            return Err(ReleaseError::InterpreterTooOld {
                found: found.to_string(),
                required: package.min_python.clone(),
            });
        }

        GitTask::new(self.ctx).check_installed().await?;

        if !options.skip_github {
            GithubTask::new(self.ctx)?.check_cli().await?;
        }

        DependencyChecker::new(runner, package.python.as_str())
            .ensure(&package.build_dependencies)
            .await?;

        info!("All prerequisites satisfied!");
        Ok(())
    }

    /// Confirm what was published is visible
    async fn verify(&self, options: &PublishOptions) -> Result<(), ReleaseError> {
        info!("Verifying publication...");

        if !options.skip_github {
            GithubTask::new(self.ctx)?.view_repo().await?;
        }
        if !options.skip_pypi {
            self.build
                .pypi()
                .verify(IndexTarget::from_test_flag(options.test_pypi))
                .await?;
        }

        info!("Publication verification completed!");
        Ok(())
    }

    fn announce(&self, options: &PublishOptions) {
        let config = self.ctx.config;
        let name = config.package().name.unwrap_or_default();
        let verify = config.verify();

        info!("{}", "=".repeat(60));
        info!("PUBLICATION COMPLETED SUCCESSFULLY!");
        info!("{}", "=".repeat(60));
        if !options.skip_github
            && let Ok(repo) = RepoRef::from_config(config)
        {
            info!("GitHub Repository: {}", repo.url());
        }
        if !options.skip_pypi {
            let target = IndexTarget::from_test_flag(options.test_pypi);
            info!("{} Package: {}", target.label(), target.project_url(&verify, &name));
            info!("Installation: {}", target.install_hint(&verify, &name));
        }
        if let Some(documentation) = config.package().documentation {
            info!("Documentation: {}", documentation);
        }
        info!("{}", "=".repeat(60));
    }
}
