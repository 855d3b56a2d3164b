//! Repository provisioning through the `gh` CLI
//!
//! Every call goes through `gh` so authentication stays with the CLI.
//! JSON request bodies are written to `gh api --input -` on stdin.

use super::TaskContext;
use crate::core::config::{RepositoryConfig, ShipConfig};
use crate::core::error::ReleaseError;
use crate::core::traits::CommandSpec;
use crate::security::token_manager::SecureTokenManager;
use crate::validation::version_validator::VersionValidator;
use tracing::{debug, info, warn};

/// `owner/name` of the hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Repository name defaults to the package name
    pub fn from_config(config: &ShipConfig) -> Result<Self, ReleaseError> {
        let repository = config.repository();
        let owner = repository
            .owner
            .filter(|o| !o.is_empty())
            .ok_or_else(|| ReleaseError::Config("repository.owner is required".to_string()))?;
        let name = repository
            .name
            .or_else(|| config.package().name)
            .ok_or_else(|| {
                ReleaseError::Config("repository.name or package.name is required".to_string())
            })?;
        Ok(Self { owner, name })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn url(&self) -> String {
        format!("https://github.com/{}", self.slug())
    }

    pub fn clone_url(&self) -> String {
        format!("{}.git", self.url())
    }
}

/// Result of the label step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOutcome {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub failed: Vec<String>,
}

pub struct GithubTask<'a> {
    ctx: TaskContext<'a>,
    repo: RepoRef,
    repository: RepositoryConfig,
    tokens: SecureTokenManager,
}

impl<'a> GithubTask<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Result<Self, ReleaseError> {
        Self::with_tokens(ctx, SecureTokenManager::from_env())
    }

    pub fn with_tokens(
        ctx: TaskContext<'a>,
        tokens: SecureTokenManager,
    ) -> Result<Self, ReleaseError> {
        Ok(Self {
            ctx,
            repo: RepoRef::from_config(ctx.config)?,
            repository: ctx.config.repository(),
            tokens,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// `gh --version` and `gh auth status`
    ///
    /// Returns the environment variable holding the GitHub token, if any;
    /// without one `gh` uses its stored login.
    pub async fn check_cli(&self) -> Result<Option<&'static str>, ReleaseError> {
        info!("Checking GitHub CLI...");
        let runner = self.ctx.runner;

        let installed = runner
            .run_logged("check gh", &CommandSpec::new("gh").arg("--version"))
            .await
            .map(|output| output.success())
            .unwrap_or(false);
        if !installed {
            return Err(ReleaseError::ToolNotInstalled {
                tool: "GitHub CLI".to_string(),
            });
        }

        let spec = CommandSpec::new("gh").args(["auth", "status"]);
        if !runner.run_logged("check gh", &spec).await?.success() {
            return Err(ReleaseError::NotAuthenticated {
                tool: "GitHub CLI".to_string(),
            });
        }

        if self.tokens.has_token("github") {
            let var = self.tokens.get_token_name("github");
            info!("GitHub token found in {}", var.unwrap_or_default());
            Ok(var)
        } else {
            info!("No GH_TOKEN or GITHUB_TOKEN set, using the gh login");
            Ok(None)
        }
    }

    fn masked(&self, error: ReleaseError) -> ReleaseError {
        self.tokens.mask_error(error)
    }

    pub fn create_command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("gh")
            .args(["repo", "create"])
            .arg(self.repo.slug())
            .arg(self.repository.visibility.as_flag());
        if let Some(description) = &self.repository.description {
            spec = spec.arg("--description").arg(description);
        }
        if let Some(homepage) = &self.repository.homepage {
            spec = spec.arg("--homepage").arg(homepage);
        }
        spec
    }

    /// Create the repository; an existing one is accepted
    ///
    /// Returns `true` when the repository was created by this call.
    pub async fn create_repo(&self) -> Result<bool, ReleaseError> {
        info!("Creating GitHub repository...");
        let spec = self.create_command();
        let output = self.ctx.runner.run_logged("create repository", &spec).await?;

        if output.success() {
            info!("Repository created successfully!");
            return Ok(true);
        }
        if output.stderr.contains("already exists") {
            info!("Repository already exists, continuing...");
            return Ok(false);
        }
        Err(self.masked(ReleaseError::CommandFailed {
            step: "create repository".to_string(),
            command: spec.to_string(),
            stderr: output.stderr.trim().to_string(),
        }))
    }

    /// Feature toggles and merge settings, then topics
    pub async fn apply_settings(&self) -> Result<(), ReleaseError> {
        info!("Setting up repository settings...");
        let runner = self.ctx.runner;

        let payload = serde_json::to_string(&self.repository.settings)
            .map_err(|e| ReleaseError::Config(format!("invalid repository settings: {}", e)))?;
        let spec = CommandSpec::new("gh")
            .args(["api", "--method", "PATCH"])
            .arg(format!("repos/{}", self.repo.slug()))
            .args(["--input", "-"])
            .stdin(payload);
        let settings = runner
            .run_checked("repository settings", &spec)
            .await
            .map_err(|e| self.masked(e));

        let topics = if self.repository.topics.is_empty() {
            debug!("No topics configured");
            Ok(())
        } else {
            let spec = CommandSpec::new("gh")
                .args(["repo", "edit"])
                .arg(self.repo.slug())
                .arg("--add-topic")
                .arg(self.repository.topics.join(","));
            runner
                .run_checked("repository topics", &spec)
                .await
                .map(|_| ())
                .map_err(|e| self.masked(e))
                .inspect_err(|_| warn!("Failed to set repository topics"))
        };

        settings?;
        topics
    }

    /// Create every configured label, tolerating ones that already exist
    pub async fn create_labels(&self) -> Result<LabelOutcome, ReleaseError> {
        info!("Setting up repository labels...");
        let mut outcome = LabelOutcome::default();
        let endpoint = format!("repos/{}/labels", self.repo.slug());

        for label in &self.repository.labels {
            let spec = CommandSpec::new("gh")
                .args(["api", endpoint.as_str(), "--method", "POST"])
                .arg("-f")
                .arg(format!("name={}", label.name))
                .arg("-f")
                .arg(format!("color={}", label.color))
                .arg("-f")
                .arg(format!("description={}", label.description));

            let output = self.ctx.runner.run_logged("labels", &spec).await?;
            if output.success() {
                outcome.created.push(label.name.clone());
            } else if output.stderr.contains("already_exists")
                || output.stdout.contains("already_exists")
            {
                outcome.existing.push(label.name.clone());
            } else {
                warn!("Failed to create label: {}", label.name);
                outcome.failed.push(label.name.clone());
            }
        }

        if !outcome.failed.is_empty() {
            return Err(ReleaseError::CommandFailed {
                step: "labels".to_string(),
                command: format!("gh api {} --method POST", endpoint),
                stderr: format!("failed to create labels: {}", outcome.failed.join(", ")),
            });
        }
        Ok(outcome)
    }

    /// Protect the default branch; expected to fail before the first push
    pub async fn protect_branch(&self) -> Result<(), ReleaseError> {
        let protection = &self.repository.branch_protection;
        if !protection.enabled {
            info!("Branch protection disabled, skipping");
            return Ok(());
        }

        info!("Setting up branch protection...");
        let spec = CommandSpec::new("gh")
            .args(["api", "--method", "PUT"])
            .arg(format!(
                "repos/{}/branches/{}/protection",
                self.repo.slug(),
                self.repository.default_branch
            ))
            .args(["--input", "-"])
            .stdin(protection.to_payload().to_string());

        self.ctx
            .runner
            .run_checked("branch protection", &spec)
            .await
            .map_err(|e| self.masked(e))
            .inspect_err(|_| {
                warn!(
                    "Failed to set up branch protection \
                     (this is normal if the branch doesn't exist yet)"
                )
            })?;
        Ok(())
    }

    pub fn release_command(&self) -> Result<CommandSpec, ReleaseError> {
        let package = self.ctx.config.package();
        let release = self.ctx.config.release();
        let version = package
            .version
            .clone()
            .ok_or_else(|| ReleaseError::Config("package.version is required".to_string()))?;
        let display_name = package.name.clone().unwrap_or_else(|| self.repo.name.clone());

        let tag = release.tag.clone().unwrap_or_else(|| format!("v{}", version));
        let title = release
            .title
            .clone()
            .unwrap_or_else(|| format!("{} v{}", display_name, version));

        let mut spec = CommandSpec::new("gh")
            .args(["release", "create"])
            .arg(tag)
            .arg("--title")
            .arg(title);

        spec = match (&release.notes, &release.notes_file) {
            (Some(notes), _) => spec.arg("--notes").arg(notes),
            (None, Some(file)) => spec.arg("--notes-file").arg(file),
            (None, None) => spec.arg("--notes").arg(format!(
                "# {} v{}\n\nInstall with:\n\n    pip install {}\n",
                display_name, version, display_name
            )),
        };

        if VersionValidator::new().is_prerelease(&version) {
            spec = spec.arg("--prerelease");
        } else if release.latest {
            spec = spec.arg("--latest");
        }
        Ok(spec)
    }

    pub async fn create_release(&self) -> Result<(), ReleaseError> {
        info!("Creating release...");
        let spec = self.release_command()?;
        self.ctx
            .runner
            .run_checked("release", &spec)
            .await
            .map_err(|e| self.masked(e))
            .inspect_err(|_| warn!("Failed to create release (this is normal if already exists)"))?;
        Ok(())
    }

    /// `gh repo view`, used to confirm the repository is reachable
    pub async fn view_repo(&self) -> Result<(), ReleaseError> {
        let spec = CommandSpec::new("gh").args(["repo", "view"]).arg(self.repo.slug());
        self.ctx
            .runner
            .run_checked("verify repository", &spec)
            .await
            .map_err(|e| ReleaseError::VerificationFailed {
                target: "GitHub repository".to_string(),
                message: self.masked(e).to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{LabelConfig, PackageConfig, ReleaseConfig};
    use crate::core::traits::CommandOutput;
    use crate::test_support::ScriptedRunner;
    use std::path::Path;

    fn tokens(pairs: &[(&str, &str)]) -> SecureTokenManager {
        SecureTokenManager::with_vars(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn config() -> ShipConfig {
        ShipConfig {
            package: Some(PackageConfig {
                name: Some("opensearcheval".to_string()),
                version: Some("1.0.0".to_string()),
                ..Default::default()
            }),
            repository: Some(RepositoryConfig {
                owner: Some("llamasearchai".to_string()),
                name: Some("OpenSearchEval".to_string()),
                description: Some("Search evaluation platform".to_string()),
                topics: vec!["search".to_string(), "python".to_string()],
                labels: vec![
                    LabelConfig {
                        name: "bug".to_string(),
                        color: "d73a4a".to_string(),
                        description: "Something isn't working".to_string(),
                    },
                    LabelConfig {
                        name: "good first issue".to_string(),
                        color: "7057ff".to_string(),
                        description: "Good for newcomers".to_string(),
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_repo_ref() {
        let repo = RepoRef::from_config(&config()).unwrap();
        assert_eq!(repo.slug(), "llamasearchai/OpenSearchEval");
        assert_eq!(repo.url(), "https://github.com/llamasearchai/OpenSearchEval");
        assert_eq!(repo.clone_url(), "https://github.com/llamasearchai/OpenSearchEval.git");

        let mut config = config();
        config.repository.as_mut().unwrap().name = None;
        assert_eq!(RepoRef::from_config(&config).unwrap().name, "opensearcheval");

        config.repository.as_mut().unwrap().owner = None;
        assert!(matches!(RepoRef::from_config(&config), Err(ReleaseError::Config(_))));
    }

    #[tokio::test]
    async fn test_check_cli() {
        let config = config();

        let runner = ScriptedRunner::new().fail("gh", &["--version"], "command not found");
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();
        assert!(matches!(task.check_cli().await, Err(ReleaseError::ToolNotInstalled { .. })));

        let runner = ScriptedRunner::new().fail("gh", &["auth", "status"], "You are not logged in");
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();
        assert!(matches!(task.check_cli().await, Err(ReleaseError::NotAuthenticated { .. })));
    }

    #[tokio::test]
    async fn test_check_cli_reports_token_variable() {
        let config = config();
        let runner = ScriptedRunner::new();
        let ctx = TaskContext::new(&runner, Path::new("."), &config);

        let task = GithubTask::with_tokens(ctx, tokens(&[("GITHUB_TOKEN", "ghp_0123456789abcdef")]))
            .unwrap();
        assert_eq!(task.check_cli().await.unwrap(), Some("GITHUB_TOKEN"));

        let task = GithubTask::with_tokens(ctx, tokens(&[])).unwrap();
        assert_eq!(task.check_cli().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_output_has_token_masked() {
        let config = config();
        let runner = ScriptedRunner::new().fail(
            "gh",
            &["repo", "create"],
            "HTTP 401: Bad credentials (token ghp_0123456789abcdef)",
        );
        let task = GithubTask::with_tokens(
            TaskContext::new(&runner, Path::new("."), &config),
            tokens(&[("GH_TOKEN", "ghp_0123456789abcdef")]),
        )
        .unwrap();

        let message = task.create_repo().await.unwrap_err().to_string();
        assert!(message.contains("Bad credentials"));
        assert!(!message.contains("ghp_0123456789abcdef"));
        assert!(message.contains("ghp...def"));
    }

    #[tokio::test]
    async fn test_create_repo_tolerates_existing() {
        let config = config();
        let runner = ScriptedRunner::new().fail(
            "gh",
            &["repo", "create"],
            "GraphQL: Name already exists on this account (createRepository)",
        );
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        assert!(!task.create_repo().await.unwrap());
        assert_eq!(
            runner.calls()[0].args,
            vec![
                "repo",
                "create",
                "llamasearchai/OpenSearchEval",
                "--public",
                "--description",
                "Search evaluation platform"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_repo_other_failure() {
        let config = config();
        let runner =
            ScriptedRunner::new().fail("gh", &["repo", "create"], "HTTP 401: Bad credentials");
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        assert!(matches!(
            task.create_repo().await,
            Err(ReleaseError::CommandFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_settings_sent_on_stdin() {
        let config = config();
        let runner = ScriptedRunner::new();
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        task.apply_settings().await.unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0].line(),
            "gh api --method PATCH repos/llamasearchai/OpenSearchEval --input -"
        );
        let body: serde_json::Value =
            serde_json::from_str(calls[0].stdin.as_deref().unwrap()).unwrap();
        assert_eq!(body["delete_branch_on_merge"], true);
        assert_eq!(body["squash_merge_commit_title"], "PR_TITLE");
        assert_eq!(
            calls[1].line(),
            "gh repo edit llamasearchai/OpenSearchEval --add-topic search,python"
        );
    }

    #[tokio::test]
    async fn test_labels_existing_is_silent() {
        let config = config();
        let runner = ScriptedRunner::new().respond(
            "gh",
            &[
                "api",
                "repos/llamasearchai/OpenSearchEval/labels",
                "--method",
                "POST",
                "-f",
                "name=bug",
            ],
            CommandOutput::failed(1, r#"{"errors":[{"code":"already_exists"}]}"#),
        );
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        let outcome = task.create_labels().await.unwrap();
        assert_eq!(outcome.existing, vec!["bug"]);
        assert_eq!(outcome.created, vec!["good first issue"]);
        assert!(runner.calls()[1].args.contains(&"name=good first issue".to_string()));
    }

    #[tokio::test]
    async fn test_labels_existing_reported_on_stdout() {
        let config = config();
        let runner = ScriptedRunner::new().respond(
            "gh",
            &["api"],
            CommandOutput {
                status: Some(1),
                stdout: r#"{"message":"Validation Failed","errors":[{"code":"already_exists"}]}"#
                    .to_string(),
                stderr: "gh: Validation Failed (HTTP 422)".to_string(),
            },
        );
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        let outcome = task.create_labels().await.unwrap();
        assert_eq!(outcome.existing, vec!["bug", "good first issue"]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_labels_other_failure_is_reported() {
        let config = config();
        let runner = ScriptedRunner::new().fail("gh", &["api"], "HTTP 404: Not Found");
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        let result = task.create_labels().await;
        assert!(matches!(result, Err(ReleaseError::CommandFailed { .. })));
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_branch_protection_payload() {
        let config = config();
        let runner = ScriptedRunner::new();
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        task.protect_branch().await.unwrap();

        let call = &runner.calls()[0];
        assert_eq!(
            call.line(),
            "gh api --method PUT \
             repos/llamasearchai/OpenSearchEval/branches/main/protection --input -"
        );
        let body: serde_json::Value =
            serde_json::from_str(call.stdin.as_deref().unwrap()).unwrap();
        assert_eq!(body["required_status_checks"]["contexts"][0], "CI");
        assert!(body["restrictions"].is_null());
    }

    #[tokio::test]
    async fn test_branch_protection_disabled() {
        let mut config = config();
        config.repository.as_mut().unwrap().branch_protection.enabled = false;
        let runner = ScriptedRunner::new();
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        task.protect_branch().await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_release_command_defaults() {
        let config = config();
        let runner = ScriptedRunner::new();
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        let spec = task.release_command().unwrap();
        assert_eq!(
            &spec.args[..5],
            &["release", "create", "v1.0.0", "--title", "opensearcheval v1.0.0"]
        );
        assert_eq!(spec.args[5], "--notes");
        assert!(spec.args[6].contains("pip install opensearcheval"));
        assert_eq!(spec.args.last().map(String::as_str), Some("--latest"));
    }

    #[test]
    fn test_release_command_prerelease_and_notes_file() {
        let mut config = config();
        config.package.as_mut().unwrap().version = Some("2.0.0-rc.1".to_string());
        config.release = Some(ReleaseConfig {
            notes_file: Some("CHANGELOG.md".to_string()),
            ..Default::default()
        });
        let runner = ScriptedRunner::new();
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        let spec = task.release_command().unwrap();
        assert!(spec.starts_with("gh", &["release", "create", "v2.0.0-rc.1"]));
        assert!(spec.args.windows(2).any(|w| w == ["--notes-file", "CHANGELOG.md"]));
        assert_eq!(spec.args.last().map(String::as_str), Some("--prerelease"));
    }

    #[tokio::test]
    async fn test_view_repo_failure_is_verification_error() {
        let config = config();
        let runner = ScriptedRunner::new().fail("gh", &["repo", "view"], "Could not resolve");
        let task = GithubTask::new(TaskContext::new(&runner, Path::new("."), &config)).unwrap();

        assert!(matches!(
            task.view_repo().await,
            Err(ReleaseError::VerificationFailed { .. })
        ));
    }
}
