//! One task per external tool family
//!
//! A task method is one release step: one or more external commands, each
//! gated by a success check. Tasks share a [`TaskContext`].

pub mod cleanup_task;
pub mod git_task;
pub mod github_task;
pub mod pypi_task;
pub mod quality_task;

pub use cleanup_task::CleanupTask;
pub use git_task::GitTask;
pub use github_task::{GithubTask, LabelOutcome, RepoRef};
pub use pypi_task::{IndexTarget, PypiTask};
pub use quality_task::QualityTask;

use crate::core::config::ShipConfig;
use crate::core::traits::CommandRunner;
use std::path::Path;

/// What every task needs: a command runner, the project and its configuration
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub root: &'a Path,
    pub config: &'a ShipConfig,
    /// Leave the filesystem and the network alone
    pub dry_run: bool,
}

impl<'a> TaskContext<'a> {
    pub fn new(runner: &'a dyn CommandRunner, root: &'a Path, config: &'a ShipConfig) -> Self {
        Self {
            runner,
            root,
            config,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Interpreter used for every `python -m ...` command
    pub fn python(&self) -> String {
        self.config.package().python
    }
}
