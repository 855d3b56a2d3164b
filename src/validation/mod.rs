pub mod content_scanner;
pub mod dependency_checker;
pub mod manifest_validator;
pub mod version_validator;

pub use content_scanner::{ContentFinding, ContentScanner};
pub use dependency_checker::{DependencyCheckResult, DependencyChecker};
pub use manifest_validator::{ManifestMetadata, ManifestValidator};
pub use version_validator::VersionValidator;

use crate::core::config::{ContentConfig, PackageConfig};
use crate::core::error::ReleaseError;
use std::path::Path;
use tracing::info;

/// Local checks run before anything touches the network
///
/// Returns every problem found: missing required files, forbidden content
/// in the documentation files and version literal mismatches.
pub async fn package_problems(
    root: &Path,
    package: &PackageConfig,
    content: &ContentConfig,
) -> Result<Vec<ReleaseError>, ReleaseError> {
    let manifest = ManifestValidator::new();
    let mut problems: Vec<ReleaseError> = manifest
        .missing_files(root, &package.required_files())
        .into_iter()
        .map(|path| ReleaseError::MissingFile { path })
        .collect();

    let scanner = ContentScanner::new(&content.forbidden)?;
    problems.extend(
        scanner
            .scan_files(root, &content.files)
            .await?
            .into_iter()
            .map(ReleaseError::from),
    );

    let version = package
        .version
        .as_deref()
        .ok_or_else(|| ReleaseError::Config("package.version is required".to_string()))?;
    let init_file = package
        .init_file()
        .ok_or_else(|| ReleaseError::Config("package.name is required".to_string()))?;

    if let Err(e) = manifest
        .check_version_consistency(root, &init_file, version)
        .await
    {
        problems.push(e);
    }

    Ok(problems)
}

/// Validate the package, failing with the first problem found
pub async fn validate_package(
    root: &Path,
    package: &PackageConfig,
    content: &ContentConfig,
) -> Result<(), ReleaseError> {
    info!("Validating package structure...");

    let manifest = ManifestValidator::new();
    manifest.check_required_files(root, &package.required_files())?;

    let scanner = ContentScanner::new(&content.forbidden)?;
    if let Some(finding) = scanner.scan_files(root, &content.files).await?.into_iter().next() {
        return Err(finding.into());
    }

    let version = package
        .version
        .as_deref()
        .ok_or_else(|| ReleaseError::Config("package.version is required".to_string()))?;
    let init_file = package
        .init_file()
        .ok_or_else(|| ReleaseError::Config("package.name is required".to_string()))?;
    manifest
        .check_version_consistency(root, &init_file, version)
        .await?;

    info!("Package validation passed!");
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::config::PackageConfig;
    use tempfile::TempDir;

    /// A project directory that passes every package check
    pub fn valid_project() -> (TempDir, PackageConfig) {
        let dir = TempDir::new().unwrap();
        let write = |path: &str, content: &str| {
            let path = dir.path().join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        };

        write("README.md", "# demo-pkg\n");
        write("LICENSE", "MIT\n");
        write(
            "pyproject.toml",
            "[project]\nname = \"demo-pkg\"\nversion = \"1.0.0\"\n",
        );
        write("setup.py", "from setuptools import setup\nsetup()\n");
        write("requirements.txt", "requests\n");
        write("CHANGELOG.md", "## 1.0.0\n");
        write("CONTRIBUTING.md", "Be kind.\n");
        write("demo_pkg/__init__.py", "__version__ = \"1.0.0\"\n");

        let package = PackageConfig {
            name: Some("demo-pkg".to_string()),
            version: Some("1.0.0".to_string()),
            ..Default::default()
        };
        (dir, package)
    }
}
