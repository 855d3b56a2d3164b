//! Forbidden content scan for documentation files

use crate::core::error::ReleaseError;
use aho_corasick::AhoCorasick;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};

/// One occurrence of a forbidden pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFinding {
    /// Path relative to the project root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub pattern: String,
}

impl From<ContentFinding> for ReleaseError {
    fn from(finding: ContentFinding) -> Self {
        ReleaseError::ForbiddenContent {
            file: finding.file,
            line: finding.line,
            pattern: finding.pattern,
        }
    }
}

/// Multi-pattern matcher over documentation files
pub struct ContentScanner {
    automaton: Option<AhoCorasick>,
    patterns: Vec<String>,
}

impl ContentScanner {
    pub fn new(patterns: &[String]) -> Result<Self, ReleaseError> {
        let patterns: Vec<String> = patterns.iter().filter(|p| !p.is_empty()).cloned().collect();
        let automaton = if patterns.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&patterns).map_err(|e| {
                ReleaseError::Config(format!("invalid forbidden content pattern: {}", e))
            })?)
        };

        Ok(Self {
            automaton,
            patterns,
        })
    }

    /// `(line, pattern)` for every match in `text`
    pub fn scan_text(&self, text: &str) -> Vec<(usize, String)> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        text.lines()
            .enumerate()
            .flat_map(|(index, line)| {
                automaton
                    .find_iter(line)
                    .map(move |m| (index + 1, self.patterns[m.pattern().as_usize()].clone()))
            })
            .collect()
    }

    /// Scan `files` (relative to `root`); missing files are skipped
    pub async fn scan_files(
        &self,
        root: &Path,
        files: &[String],
    ) -> Result<Vec<ContentFinding>, ReleaseError> {
        let mut findings = Vec::new();

        for file in files {
            let path = root.join(file);
            if !path.is_file() {
                debug!("Skipping content scan of missing {}", file);
                continue;
            }

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| ReleaseError::io(format!("failed to read {}", path.display()), e))?;

            for (line, pattern) in self.scan_text(&content) {
                error!("Emoji found in {}:{}: {}", file, line, pattern);
                findings.push(ContentFinding {
                    file: PathBuf::from(file),
                    line,
                    pattern,
                });
            }
        }

        Ok(findings)
    }
}
