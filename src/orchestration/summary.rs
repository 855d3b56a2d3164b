//! PUBLICATION_SUMMARY.md writer

use crate::core::config::ShipConfig;
use crate::core::error::ReleaseError;
use crate::core::report::StepReport;
use crate::tasks::{IndexTarget, RepoRef};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARY_FILENAME: &str = "PUBLICATION_SUMMARY.md";

/// What was published, for the summary header
#[derive(Debug, Clone, Copy)]
pub struct PublishedParts {
    pub github: bool,
    pub index: Option<IndexTarget>,
}

pub fn render_summary(
    config: &ShipConfig,
    parts: PublishedParts,
    steps: &[StepReport],
    finished_at: DateTime<Utc>,
) -> String {
    let package = config.package();
    let repository = config.repository();
    let verify = config.verify();
    let name = package.name.clone().unwrap_or_default();
    let unknown = || "-".to_string();

    let mut out = String::new();
    let _ = writeln!(out, "# {} Publication Summary\n", name);

    let _ = writeln!(out, "## Package Information");
    let _ = writeln!(out, "- **Name**: {}", name);
    let _ = writeln!(out, "- **Version**: {}", package.version.clone().unwrap_or_else(unknown));
    let _ = writeln!(out, "- **Author**: {}", package.author.clone().unwrap_or_else(unknown));
    let _ = writeln!(out, "- **License**: {}\n", package.license.clone().unwrap_or_else(unknown));

    if parts.github
        && let Ok(repo) = RepoRef::from_config(config)
    {
        let _ = writeln!(out, "## GitHub Repository");
        let _ = writeln!(out, "- **URL**: {}", repo.url());
        if !repository.topics.is_empty() {
            let _ = writeln!(out, "- **Topics**: {}", repository.topics.join(", "));
        }
        if repository.branch_protection.enabled {
            let _ = writeln!(
                out,
                "- **Branch Protection**: Enabled for {} branch",
                repository.default_branch
            );
        }
        out.push('\n');
    }

    if let Some(target) = parts.index {
        let _ = writeln!(out, "## {} Package", target.label());
        let _ = writeln!(out, "- **URL**: {}", target.project_url(&verify, &name));
        let _ = writeln!(out, "- **Installation**: `{}`\n", target.install_hint(&verify, &name));
    }

    if let Some(documentation) = &package.documentation {
        let _ = writeln!(out, "## Documentation");
        let _ = writeln!(out, "- {}\n", documentation);
    }

    let _ = writeln!(out, "## Steps\n");
    let _ = writeln!(out, "| Step | Status | Details |");
    let _ = writeln!(out, "|------|--------|---------|");
    for step in steps {
        let details = step
            .message
            .as_deref()
            .unwrap_or("")
            .replace('|', "\\|")
            .replace('\n', " ");
        let _ = writeln!(out, "| {} | {} | {} |", step.name, step.status.as_str(), details);
    }

    let _ = writeln!(out, "\n---\n");
    let _ = writeln!(
        out,
        "Publication completed successfully on {}",
        finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

/// Write the summary to the project root
pub async fn write_summary(
    root: &Path,
    config: &ShipConfig,
    parts: PublishedParts,
    steps: &[StepReport],
) -> Result<PathBuf, ReleaseError> {
    info!("Creating publication summary report...");
    let path = root.join(SUMMARY_FILENAME);
    let content = render_summary(config, parts, steps, Utc::now());

    tokio::fs::write(&path, content)
        .await
        .map_err(|e| ReleaseError::io(format!("failed to write {}", path.display()), e))?;

    info!("Publication summary report created: {}", SUMMARY_FILENAME);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PackageConfig, RepositoryConfig};
    use crate::core::report::StepStatus;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config() -> ShipConfig {
        ShipConfig {
            package: Some(PackageConfig {
                name: Some("opensearcheval".to_string()),
                version: Some("1.0.0".to_string()),
                author: Some("Nik Jois".to_string()),
                license: Some("MIT".to_string()),
                documentation: Some("https://opensearcheval.readthedocs.io/".to_string()),
                ..Default::default()
            }),
            repository: Some(RepositoryConfig {
                owner: Some("llamasearchai".to_string()),
                name: Some("OpenSearchEval".to_string()),
                topics: vec!["search".to_string(), "mlx".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn steps() -> Vec<StepReport> {
        vec![
            StepReport {
                name: "validate package".to_string(),
                status: StepStatus::Passed,
                message: None,
                duration_ms: 3,
            },
            StepReport {
                name: "lint".to_string(),
                status: StepStatus::Warned,
                message: Some("E501 | line too long".to_string()),
                duration_ms: 1200,
            },
        ]
    }

    #[test]
    fn test_render_summary() {
        let finished = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let parts = PublishedParts {
            github: true,
            index: Some(IndexTarget::Pypi),
        };

        let summary = render_summary(&config(), parts, &steps(), finished);

        assert!(summary.starts_with("# opensearcheval Publication Summary"));
        assert!(summary.contains("- **Author**: Nik Jois"));
        assert!(summary.contains("- **URL**: https://github.com/llamasearchai/OpenSearchEval"));
        assert!(summary.contains("- **Topics**: search, mlx"));
        assert!(summary.contains("Enabled for main branch"));
        assert!(summary.contains("https://pypi.org/project/opensearcheval/"));
        assert!(summary.contains("`pip install opensearcheval`"));
        assert!(summary.contains("| lint | warned | E501 \\| line too long |"));
        assert!(
            summary.ends_with("Publication completed successfully on 2026-03-01 12:30:00 UTC\n")
        );
    }

    #[test]
    fn test_render_summary_omits_unpublished_parts() {
        let parts = PublishedParts {
            github: false,
            index: None,
        };
        let summary = render_summary(&config(), parts, &[], Utc::now());

        assert!(!summary.contains("## GitHub Repository"));
        assert!(!summary.contains("Package\n- **URL**"));
        assert!(summary.contains("## Steps"));
    }

    #[tokio::test]
    async fn test_write_summary() {
        let dir = TempDir::new().unwrap();
        let parts = PublishedParts {
            github: false,
            index: Some(IndexTarget::TestPypi),
        };

        let path = write_summary(dir.path(), &config(), parts, &steps()).await.unwrap();

        assert_eq!(path, dir.path().join(SUMMARY_FILENAME));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("## Test PyPI Package"));
    }
}
