//! Removal of build artifacts

use super::TaskContext;
use crate::core::error::ReleaseError;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const BUILD_DIRS: &[&str] = &["build", "dist"];

pub struct CleanupTask<'a> {
    ctx: TaskContext<'a>,
}

impl<'a> CleanupTask<'a> {
    pub fn new(ctx: TaskContext<'a>) -> Self {
        Self { ctx }
    }

    /// `build/`, `dist/` and every `*.egg-info` directory at the project
    /// root or directly under `src/`
    pub fn targets(&self) -> Vec<PathBuf> {
        let root = self.ctx.root;
        let mut targets: Vec<PathBuf> = BUILD_DIRS
            .iter()
            .map(|d| root.join(d))
            .filter(|p| p.is_dir())
            .collect();

        for base in [root.to_path_buf(), root.join("src")] {
            targets.extend(egg_info_dirs(&base));
        }
        targets
    }

    /// Remove the build directories, returning what was removed
    pub async fn clean(&self) -> Result<Vec<PathBuf>, ReleaseError> {
        info!("Cleaning build directories...");

        let targets = self.targets();
        for target in &targets {
            let shown = target.strip_prefix(self.ctx.root).unwrap_or(target);
            if self.ctx.dry_run {
                info!("[dry-run] would remove {}", shown.display());
                continue;
            }
            tokio::fs::remove_dir_all(target).await.map_err(|e| {
                ReleaseError::io(format!("failed to remove {}", target.display()), e)
            })?;
            info!("Removed {}", shown.display());
        }

        Ok(targets)
    }
}

fn egg_info_dirs(base: &Path) -> Vec<PathBuf> {
    if !base.is_dir() {
        return Vec::new();
    }

    WalkDir::new(base)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".egg-info"))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ShipConfig;
    use crate::test_support::ScriptedRunner;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        for d in ["build/lib", "dist", "demo.egg-info", "src/demo_src.egg-info", "docs"] {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        std::fs::write(dir.path().join("dist/demo-1.0.0.tar.gz"), b"").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_clean_removes_build_artifacts() {
        let dir = project();
        let runner = ScriptedRunner::new();
        let config = ShipConfig::default();
        let task = CleanupTask::new(TaskContext::new(&runner, dir.path(), &config));

        let removed = task.clean().await.unwrap();

        assert_eq!(removed.len(), 4);
        assert!(!dir.path().join("build").exists());
        assert!(!dir.path().join("dist").exists());
        assert!(!dir.path().join("demo.egg-info").exists());
        assert!(!dir.path().join("src/demo_src.egg-info").exists());
        assert!(dir.path().join("docs").exists());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_keeps_directories() {
        let dir = project();
        let runner = ScriptedRunner::new();
        let config = ShipConfig::default();
        let task = CleanupTask::new(TaskContext::new(&runner, dir.path(), &config).dry_run(true));

        let removed = task.clean().await.unwrap();

        assert_eq!(removed.len(), 4);
        assert!(dir.path().join("dist").exists());
    }

    #[tokio::test]
    async fn test_clean_project_is_noop() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let config = ShipConfig::default();
        let task = CleanupTask::new(TaskContext::new(&runner, dir.path(), &config));

        assert!(task.clean().await.unwrap().is_empty());
    }
}
