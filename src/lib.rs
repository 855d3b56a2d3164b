pub mod core;
pub mod orchestration;
pub mod security;
pub mod tasks;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use core::*;
pub use orchestration::{
    BuildOptions, BuildPublisher, GithubOptions, PublishOptions, ReleasePublisher, RepoProvisioner,
};
pub use security::{CommandError, DryRunExecutor, SafeCommandExecutor, SecureTokenManager};
pub use tasks::TaskContext;
