//! Orchestration layer for Python package releases
//!
//! Three pipelines share one step recorder: the build pipeline, the GitHub
//! pipeline and the complete release pipeline that runs both.

pub mod build_publisher;
pub mod release_publisher;
pub mod repo_provisioner;
pub mod summary;

pub use build_publisher::{BuildOptions, BuildPublisher};
pub use release_publisher::{PublishOptions, ReleasePublisher};
pub use repo_provisioner::{GithubOptions, RepoProvisioner};
pub use summary::{PublishedParts, SUMMARY_FILENAME, render_summary, write_summary};
