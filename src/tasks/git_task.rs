//! Local repository setup and the initial push

use super::TaskContext;
use super::github_task::RepoRef;
use crate::core::error::ReleaseError;
use crate::core::traits::CommandSpec;
use tracing::{debug, error, info};

pub struct GitTask<'a> {
    ctx: TaskContext<'a>,
}

impl<'a> GitTask<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn check_installed(&self) -> Result<(), ReleaseError> {
        let installed = self
            .ctx
            .runner
            .run_logged("check git", &CommandSpec::new("git").arg("--version"))
            .await
            .map(|output| output.success())
            .unwrap_or(false);

        if installed {
            Ok(())
        } else {
            Err(ReleaseError::ToolNotInstalled {
                tool: "Git".to_string(),
            })
        }
    }

    fn commit_message(&self) -> String {
        if let Some(message) = self.ctx.config.repository().commit_message {
            return message;
        }
        let package = self.ctx.config.package();
        match (package.name, package.version) {
            (Some(name), Some(version)) => format!("Initial commit: {} v{}", name, version),
            _ => "Initial commit".to_string(),
        }
    }

    /// Initialise if needed, commit everything and push the default branch
    ///
    /// Adding the remote and committing may fail harmlessly (remote already
    /// configured, nothing to commit); only the push is checked.
    pub async fn push(&self, repo: &RepoRef) -> Result<(), ReleaseError> {
        info!("Pushing code to repository...");
        let runner = self.ctx.runner;
        let branch = self.ctx.config.repository().default_branch;

        if !self.ctx.root.join(".git").exists() {
            runner.run_checked("push", &CommandSpec::new("git").arg("init")).await?;
            let rename = CommandSpec::new("git").args(["branch", "-M", branch.as_str()]);
            runner.run_checked("push", &rename).await?;
        }

        let tolerated = [
            CommandSpec::new("git")
                .args(["remote", "add", "origin"])
                .arg(repo.clone_url()),
            CommandSpec::new("git").args(["add", "."]),
            CommandSpec::new("git")
                .args(["commit", "-m"])
                .arg(self.commit_message()),
        ];
        for spec in &tolerated {
            if !runner.run_logged("push", spec).await?.success() {
                debug!("Ignoring failure of: {}", spec);
            }
        }

        let spec = CommandSpec::new("git").args(["push", "-u", "origin", branch.as_str()]);
        runner
            .run_checked("push", &spec)
            .await
            .inspect_err(|_| error!("Failed to push code to repository"))?;

        info!("Code pushed successfully!");
        Ok(())
    }
}
