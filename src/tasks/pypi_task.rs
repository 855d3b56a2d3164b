//! Build, check, upload and verify a distribution on the package index
//!
//! Packaging itself is delegated to `python -m build` and `twine`. The only
//! network access made directly is the read-only JSON API query used to
//! confirm that an upload became visible.

use super::TaskContext;
use crate::core::config::VerifyConfig;
use crate::core::error::ReleaseError;
use crate::core::traits::CommandSpec;
use crate::security::token_manager::{CredentialSource, SecureTokenManager};
use crate::validation::version_validator::VersionValidator;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DIST_DIR: &str = "dist";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Package index receiving the upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Pypi,
    TestPypi,
}

impl IndexTarget {
    pub fn from_test_flag(test: bool) -> Self {
        if test { Self::TestPypi } else { Self::Pypi }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::TestPypi)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pypi => "PyPI",
            Self::TestPypi => "Test PyPI",
        }
    }

    pub fn base_url<'v>(&self, verify: &'v VerifyConfig) -> &'v str {
        let url = match self {
            Self::Pypi => &verify.index_url,
            Self::TestPypi => &verify.test_index_url,
        };
        url.trim_end_matches('/')
    }

    /// Project page, e.g. `https://pypi.org/project/<name>/`
    pub fn project_url(&self, verify: &VerifyConfig, name: &str) -> String {
        format!("{}/project/{}/", self.base_url(verify), name)
    }

    /// JSON API endpoint for one release
    pub fn release_api_url(&self, verify: &VerifyConfig, name: &str, version: &str) -> String {
        format!("{}/pypi/{}/{}/json", self.base_url(verify), name, version)
    }

    pub fn install_hint(&self, verify: &VerifyConfig, name: &str) -> String {
        match self {
            Self::Pypi => format!("pip install {}", name),
            Self::TestPypi => format!("pip install -i {}/simple/ {}", self.base_url(verify), name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    info: ReleaseInfoBody,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfoBody {
    version: String,
}

pub struct PypiTask<'a> {
    ctx: TaskContext<'a>,
    tokens: SecureTokenManager,
}

impl<'a> PypiTask<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self::with_tokens(ctx, SecureTokenManager::from_env())
    }

    pub fn with_tokens(ctx: TaskContext<'a>, tokens: SecureTokenManager) -> Self {
        Self { ctx, tokens }
    }

    fn package_name(&self) -> Result<String, ReleaseError> {
        self.ctx
            .config
            .package()
            .name
            .ok_or_else(|| ReleaseError::Config("package.name is required".to_string()))
    }

    /// `python -m pip install <dep>` for each build dependency
    pub async fn install_build_dependencies(&self) -> Result<(), ReleaseError> {
        info!("Installing build dependencies...");
        for dep in &self.ctx.config.package().build_dependencies {
            let spec = CommandSpec::new(self.ctx.python())
                .args(["-m", "pip", "install", dep.as_str()]);
            self.ctx.runner.run_checked("install build dependencies", &spec).await?;
        }
        Ok(())
    }

    pub async fn build(&self) -> Result<(), ReleaseError> {
        info!("Building package...");
        let spec = CommandSpec::new(self.ctx.python()).args(["-m", "build"]);
        self.ctx.runner.run_checked("build", &spec).await?;
        Ok(())
    }

    /// Distribution files under `dist/`, relative to the project root
    pub fn dist_files(&self) -> Result<Vec<PathBuf>, ReleaseError> {
        let dist = self.ctx.root.join(DIST_DIR);
        let mut files: Vec<PathBuf> = match std::fs::read_dir(&dist) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_file())
                .map(|entry| Path::new(DIST_DIR).join(entry.file_name()))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ReleaseError::io(format!("failed to list {}", dist.display()), e)),
        };
        files.sort();

        if files.is_empty() {
            if self.ctx.dry_run {
                // Nothing was built, so show the shape of the command
                return Ok(vec![Path::new(DIST_DIR).join("*")]);
            }
            return Err(ReleaseError::EmptyDist { path: dist });
        }
        Ok(files)
    }

    /// `python -m twine check dist/...`
    pub async fn check(&self) -> Result<(), ReleaseError> {
        info!("Checking package...");
        let files = self.dist_files()?;
        let spec = CommandSpec::new(self.ctx.python())
            .args(["-m", "twine", "check"])
            .args(files.iter().map(|f| f.to_string_lossy().into_owned()));
        self.ctx.runner.run_checked("check", &spec).await?;
        Ok(())
    }

    pub fn upload_command(&self, target: IndexTarget) -> Result<CommandSpec, ReleaseError> {
        let files = self.dist_files()?;

        let mut spec = CommandSpec::new(self.ctx.python()).args(["-m", "twine", "upload"]);
        if target.is_test() {
            spec = spec.args(["--repository", "testpypi"]);
        }
        spec = spec.args(files.iter().map(|f| f.to_string_lossy().into_owned()));

        for (key, value) in self.tokens.upload_env(target.is_test()) {
            spec = spec.env(key, value);
        }
        Ok(spec)
    }

    /// `python -m twine upload [--repository testpypi] dist/...`
    pub async fn upload(&self, target: IndexTarget) -> Result<(), ReleaseError> {
        info!("Publishing to {}...", target.label());

        match self.tokens.upload_credentials(target.is_test()) {
            CredentialSource::Token(var) => debug!("Using upload token from {}", var),
            CredentialSource::TwineEnv => debug!("Using TWINE_PASSWORD"),
            CredentialSource::Pypirc(path) => debug!("Using credentials from {}", path.display()),
            CredentialSource::Missing => warn!(
                "No {} credentials found (set {} or configure ~/.pypirc)",
                target.label(),
                if target.is_test() { "TEST_PYPI_TOKEN" } else { "PYPI_TOKEN" }
            ),
        }

        let spec = self.upload_command(target)?;
        self.ctx
            .runner
            .run_checked("upload", &spec)
            .await
            .map_err(|e| self.tokens.mask_error(e))?;
        Ok(())
    }

    /// Wait for the index to catch up, then look the release up
    pub async fn verify(&self, target: IndexTarget) -> Result<(), ReleaseError> {
        let verify = self.ctx.config.verify();
        let name = self.package_name()?;
        let version = self
            .ctx
            .config
            .package()
            .version
            .ok_or_else(|| ReleaseError::Config("package.version is required".to_string()))?;
        // The index serves releases under their normalized version
        let normalized = VersionValidator::new().normalize_pep440(&version);
        let url = target.release_api_url(&verify, &name, &normalized);

        if self.ctx.dry_run {
            info!("[dry-run] would query {}", url);
            return Ok(());
        }

        if verify.delay_secs > 0 {
            info!("Waiting {}s for {} to update...", verify.delay_secs, target.label());
            tokio::time::sleep(Duration::from_secs(verify.delay_secs)).await;
        }

        Self::query_release(&url, &version, target).await
    }

    async fn query_release(
        url: &str,
        version: &str,
        target: IndexTarget,
    ) -> Result<(), ReleaseError> {
        let failed = |message: String| ReleaseError::VerificationFailed {
            target: target.label().to_string(),
            message,
        };

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pyship/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| failed(e.to_string()))?;

        info!("Running: GET {}", url);
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!(
                "HTTP {} (this might be normal if just published)",
                response.status().as_u16()
            )));
        }

        let release: ReleaseInfo = response.json().await.map_err(|e| failed(e.to_string()))?;
        Self::confirm_version(&release, version, target)
    }

    /// Compare the reported version with the expected one, both normalized
    fn confirm_version(
        release: &ReleaseInfo,
        version: &str,
        target: IndexTarget,
    ) -> Result<(), ReleaseError> {
        if !VersionValidator::new().same_release(&release.info.version, version) {
            return Err(ReleaseError::VerificationFailed {
                target: target.label().to_string(),
                message: format!(
                    "index reports version {}, expected {}",
                    release.info.version, version
                ),
            });
        }

        info!("{} lists version {}", target.label(), version);
        Ok(())
    }
}
