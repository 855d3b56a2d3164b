//! Configuration structures and types for pyship
//!
//! This module provides type-safe configuration management with serde support.
//! Sections are optional so that layered configs can be merged section by
//! section; fields inside a section fall back to their defaults.

use serde::{Deserialize, Serialize};

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipConfig {
    /// Schema version
    #[serde(default = "default_schema_version")]
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Python package being released
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageConfig>,

    /// GitHub repository hosting the package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryConfig>,

    /// GitHub release settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseConfig>,

    /// Test, lint and type-check settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityConfig>,

    /// Documentation content rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentConfig>,

    /// Post-publish verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyConfig>,
}

/// Python package information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageConfig {
    /// Distribution name on the package index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Import package directory (default: name with dashes replaced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Version expected in pyproject.toml and `__init__.py`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Documentation site, shown in the summary and the final banner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,

    /// Interpreter used for every `python -m ...` invocation
    pub python: String,

    /// Minimum interpreter version (major.minor)
    pub min_python: String,

    /// Files that must exist before anything is published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_files: Option<Vec<String>>,

    /// Python packages needed to build and upload
    pub build_dependencies: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: None,
            module: None,
            version: None,
            author: None,
            license: None,
            documentation: None,
            python: "python".to_string(),
            min_python: "3.9".to_string(),
            required_files: None,
            build_dependencies: vec!["build".into(), "twine".into(), "wheel".into()],
        }
    }
}

impl PackageConfig {
    /// Import package directory
    pub fn module_name(&self) -> Option<String> {
        self.module
            .clone()
            .or_else(|| self.name.as_ref().map(|n| n.replace('-', "_").to_lowercase()))
    }

    /// Path of the package init file relative to the project root
    pub fn init_file(&self) -> Option<String> {
        self.module_name().map(|m| format!("{}/__init__.py", m))
    }

    /// Required files, with the package init file appended to the defaults
    pub fn required_files(&self) -> Vec<String> {
        if let Some(files) = &self.required_files {
            return files.clone();
        }

        let mut files: Vec<String> = [
            "README.md",
            "LICENSE",
            "pyproject.toml",
            "setup.py",
            "requirements.txt",
            "CHANGELOG.md",
            "CONTRIBUTING.md",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(init) = self.init_file() {
            files.push(init);
        }
        files
    }
}

/// Repository visibility on creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_flag(&self) -> &'static str {
        match self {
            Visibility::Public => "--public",
            Visibility::Private => "--private",
        }
    }
}

/// GitHub repository configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// Owning user or organisation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name (default: package name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    pub visibility: Visibility,

    pub default_branch: String,

    pub topics: Vec<String>,

    pub labels: Vec<LabelConfig>,

    pub settings: RepositorySettings,

    pub branch_protection: BranchProtectionConfig,

    /// Message for the initial commit created by the push step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: None,
            name: None,
            description: None,
            homepage: None,
            visibility: Visibility::Public,
            default_branch: "main".to_string(),
            topics: Vec::new(),
            labels: default_labels(),
            settings: RepositorySettings::default(),
            branch_protection: BranchProtectionConfig::default(),
            commit_message: None,
        }
    }
}

/// Issue and pull request label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelConfig {
    pub name: String,
    /// Hex color without the leading `#`
    pub color: String,
    pub description: String,
}

impl LabelConfig {
    fn new(name: &str, color: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

/// Repository feature toggles, sent verbatim to the repository API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositorySettings {
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub has_downloads: bool,
    pub allow_squash_merge: bool,
    pub allow_merge_commit: bool,
    pub allow_rebase_merge: bool,
    pub delete_branch_on_merge: bool,
    pub allow_auto_merge: bool,
    pub allow_update_branch: bool,
    pub use_squash_pr_title_as_default: bool,
    pub squash_merge_commit_title: String,
    pub squash_merge_commit_message: String,
    pub merge_commit_title: String,
    pub merge_commit_message: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            has_issues: true,
            has_projects: true,
            has_wiki: true,
            has_downloads: true,
            allow_squash_merge: true,
            allow_merge_commit: true,
            allow_rebase_merge: true,
            delete_branch_on_merge: true,
            allow_auto_merge: true,
            allow_update_branch: true,
            use_squash_pr_title_as_default: true,
            squash_merge_commit_title: "PR_TITLE".to_string(),
            squash_merge_commit_message: "PR_BODY".to_string(),
            merge_commit_title: "PR_TITLE".to_string(),
            merge_commit_message: "PR_BODY".to_string(),
        }
    }
}

/// Branch protection rules for the default branch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BranchProtectionConfig {
    pub enabled: bool,
    pub strict: bool,
    pub status_checks: Vec<String>,
    pub enforce_admins: bool,
    pub required_approving_review_count: u32,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
}

impl Default for BranchProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: true,
            status_checks: vec!["CI".into(), "test".into(), "build".into()],
            enforce_admins: true,
            required_approving_review_count: 1,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
        }
    }
}

impl BranchProtectionConfig {
    /// Request body for `PUT /repos/{owner}/{repo}/branches/{branch}/protection`
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "required_status_checks": {
                "strict": self.strict,
                "contexts": self.status_checks,
            },
            "enforce_admins": self.enforce_admins,
            "required_pull_request_reviews": {
                "required_approving_review_count": self.required_approving_review_count,
                "dismiss_stale_reviews": self.dismiss_stale_reviews,
                "require_code_owner_reviews": self.require_code_owner_reviews,
            },
            "restrictions": null,
        })
    }
}

/// GitHub release configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReleaseConfig {
    /// Tag name (default: `v<version>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Release title (default: `<name> v<version>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Inline release notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Release notes file, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_file: Option<String>,

    /// Mark the release as latest
    pub latest: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            tag: None,
            title: None,
            notes: None,
            notes_file: None,
            latest: true,
        }
    }
}

/// Test suite, linter and type checker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityConfig {
    pub tests_dir: String,
    pub lint: bool,
    pub max_line_length: u32,
    pub lint_ignore: Vec<String>,
    pub type_check: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            tests_dir: "tests/".to_string(),
            lint: true,
            max_line_length: 88,
            lint_ignore: vec!["E203".into(), "W503".into()],
            type_check: true,
        }
    }
}

/// Documentation content rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentConfig {
    /// Files scanned for forbidden content (missing files are skipped)
    pub files: Vec<String>,

    /// Substrings that must not appear in those files
    pub forbidden: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            files: vec![
                "README.md".into(),
                "CHANGELOG.md".into(),
                "CONTRIBUTING.md".into(),
            ],
            forbidden: ["🎯", "🚀", "📊", "🔧", "🛡️", "📈", "❤️", "⭐"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Post-publish verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyConfig {
    /// Seconds to wait for the index to pick up the upload
    pub delay_secs: u64,

    pub index_url: String,

    pub test_index_url: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            delay_secs: 30,
            index_url: "https://pypi.org".to_string(),
            test_index_url: "https://test.pypi.org".to_string(),
        }
    }
}

/// Default label set created on new repositories
pub fn default_labels() -> Vec<LabelConfig> {
    vec![
        LabelConfig::new("bug", "d73a4a", "Something isn't working"),
        LabelConfig::new("enhancement", "a2eeef", "New feature or request"),
        LabelConfig::new("documentation", "0075ca", "Improvements or additions to documentation"),
        LabelConfig::new("good first issue", "7057ff", "Good for newcomers"),
        LabelConfig::new("help wanted", "008672", "Extra attention is needed"),
        LabelConfig::new("question", "d876e3", "Further information is requested"),
        LabelConfig::new("wontfix", "ffffff", "This will not be worked on"),
        LabelConfig::new("duplicate", "cfd3d7", "This issue or pull request already exists"),
        LabelConfig::new("invalid", "e4e669", "This doesn't seem right"),
        LabelConfig::new("priority-high", "ff0000", "High priority issue"),
        LabelConfig::new("priority-medium", "ff8c00", "Medium priority issue"),
        LabelConfig::new("priority-low", "00ff00", "Low priority issue"),
        LabelConfig::new("needs-triage", "fbca04", "Needs to be triaged"),
        LabelConfig::new("mlx", "0e8a16", "Related to MLX integration"),
        LabelConfig::new("api", "1d76db", "Related to API"),
        LabelConfig::new("ui", "5319e7", "Related to user interface"),
        LabelConfig::new("performance", "ff6b6b", "Performance related"),
        LabelConfig::new("security", "b60205", "Security related"),
        LabelConfig::new("dependencies", "0366d6", "Pull requests that update a dependency file"),
        LabelConfig::new("ci", "28a745", "Continuous integration related"),
    ]
}

/// Default configuration values
impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            extends: None,
            package: None,
            repository: None,
            release: None,
            quality: None,
            content: None,
            verify: None,
        }
    }
}

impl ShipConfig {
    pub fn package(&self) -> PackageConfig {
        self.package.clone().unwrap_or_default()
    }

    pub fn repository(&self) -> RepositoryConfig {
        self.repository.clone().unwrap_or_default()
    }

    pub fn release(&self) -> ReleaseConfig {
        self.release.clone().unwrap_or_default()
    }

    pub fn quality(&self) -> QualityConfig {
        self.quality.clone().unwrap_or_default()
    }

    pub fn content(&self) -> ContentConfig {
        self.content.clone().unwrap_or_default()
    }

    pub fn verify(&self) -> VerifyConfig {
        self.verify.clone().unwrap_or_default()
    }

    /// Starter configuration written by `pyship init`
    pub fn starter(package_name: &str, owner: &str) -> Self {
        Self {
            package: Some(PackageConfig {
                name: Some(package_name.to_string()),
                version: Some("0.1.0".to_string()),
                ..Default::default()
            }),
            repository: Some(RepositoryConfig {
                owner: Some(owner.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
