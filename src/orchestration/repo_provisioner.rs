//! Repository Provisioner - create and configure the GitHub repository
//!
//! Sequence: check gh → create repository → settings and topics → labels →
//! push → branch protection → release. Settings, labels, protection and the
//! release are soft steps.

use crate::core::error::ReleaseError;
use crate::core::report::{PipelineReport, StepRecorder};
use crate::tasks::{GitTask, GithubTask, TaskContext};
use tracing::info;

/// Flags of the GitHub pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubOptions {
    pub skip_push: bool,
    pub skip_release: bool,
}

pub struct RepoProvisioner<'a> {
    ctx: TaskContext<'a>,
}

impl<'a> RepoProvisioner<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, options: &GithubOptions) -> PipelineReport {
        let mut recorder = StepRecorder::new("github");
        let outcome = self.execute(options, &mut recorder).await;
        recorder.finish(outcome)
    }

    pub(crate) async fn execute(
        &self,
        options: &GithubOptions,
        recorder: &mut StepRecorder,
    ) -> Result<(), ReleaseError> {
        info!("Starting GitHub repository setup...");
        let github = GithubTask::new(self.ctx)?;

        recorder.hard("check gh", github.check_cli()).await?;
        recorder.hard("create repository", github.create_repo()).await?;
        recorder.soft("repository settings", github.apply_settings()).await;
        recorder.soft("labels", github.create_labels()).await;

        if options.skip_push {
            recorder.skipped("push", "--skip-push");
        } else {
            recorder
                .hard("push", GitTask::new(self.ctx).push(github.repo()))
                .await?;
        }

        // After the push so the default branch exists
        recorder.soft("branch protection", github.protect_branch()).await;

        if options.skip_release {
            recorder.skipped("release", "--skip-release");
        } else {
            recorder.soft("release", github.create_release()).await;
        }

        info!("GitHub repository setup completed successfully!");
        info!("Repository URL: {}", github.repo().url());
        Ok(())
    }
}
