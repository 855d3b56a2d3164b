//! Configuration file loader for pyship
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::ReleaseError;
use crate::validation::version_validator::VersionValidator;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".pyship.yaml";

/// Nesting limit for `extends` chains
const MAX_EXTENDS_DEPTH: usize = 8;

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    static ref LABEL_COLOR_REGEX: Regex = Regex::new(r"^[0-9a-fA-F]{6}$").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Explicit config file, replacing `<project>/.pyship.yaml`
    pub config_file: Option<PathBuf>,

    /// Skip `$HOME/.pyship.yaml`
    pub skip_global: bool,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for a project directory using the process environment
    pub fn for_project<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            config_file: None,
            skip_global: false,
            env: env::vars().collect(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "package.version")
    pub field: String,
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. Environment variables (PYSHIP_VERSION, PYSHIP_PYTHON, PYSHIP_REPOSITORY)
    /// 2. Project config (./.pyship.yaml or --config)
    /// 3. Global config (~/.pyship.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<ShipConfig, ReleaseError> {
        let mut configs: Vec<ShipConfig> = vec![ShipConfig::default()];

        if !options.skip_global
            && let Some(global_config) = Self::load_global_config(&options.env).await?
        {
            configs.push(global_config);
        }

        let project_config_path = options
            .config_file
            .clone()
            .unwrap_or_else(|| options.project_path.join(CONFIG_FILENAME));

        match Self::load_config_file(&project_config_path, 0).await? {
            Some(project_config) => configs.push(project_config),
            None if options.config_file.is_some() => {
                return Err(ReleaseError::Config(format!(
                    "config file not found: {}",
                    project_config_path.display()
                )));
            }
            None => debug!("no project config at {}", project_config_path.display()),
        }

        let mut merged_config = Self::merge_configs(configs);
        Self::apply_env_overrides(&mut merged_config, &options.env)?;

        Ok(Self::expand_env_vars(merged_config, &options.env))
    }

    /// Load global configuration from ~/.pyship.yaml
    async fn load_global_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<ShipConfig>, ReleaseError> {
        let Some(home_dir) = env.get("HOME") else {
            return Ok(None);
        };
        let global_config_path = PathBuf::from(home_dir).join(CONFIG_FILENAME);

        Self::load_config_file(&global_config_path, 0).await
    }

    /// Load configuration from YAML file
    fn load_config_file(
        file_path: &Path,
        depth: usize,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<ShipConfig>, ReleaseError>> + Send + '_>,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            if depth > MAX_EXTENDS_DEPTH {
                return Err(ReleaseError::Config(format!(
                    "extends chain deeper than {} at {}",
                    MAX_EXTENDS_DEPTH,
                    file_path.display()
                )));
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                ReleaseError::Config(format!("Failed to read config file: {}", e))
            })?;

            let config: ShipConfig = serde_yaml::from_str(&content).map_err(|e| {
                ReleaseError::Config(format!(
                    "Failed to parse YAML config {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| ReleaseError::Config("Invalid config file path".to_string()))?
                    .join(extends_path);

                match Self::load_config_file(&base_path, depth + 1).await? {
                    Some(base_config) => {
                        return Ok(Some(Self::merge_configs(vec![base_config, config])));
                    }
                    None => warn!("extended config {} not found", base_path.display()),
                }
            }

            Ok(Some(config))
        })
    }

    /// Patch individual fields from environment variables
    fn apply_env_overrides(
        config: &mut ShipConfig,
        env: &HashMap<String, String>,
    ) -> Result<(), ReleaseError> {
        if let Some(version) = env.get("PYSHIP_VERSION") {
            config.package.get_or_insert_with(Default::default).version = Some(version.clone());
        }

        if let Some(python) = env.get("PYSHIP_PYTHON") {
            config.package.get_or_insert_with(Default::default).python = python.clone();
        }

        // PYSHIP_REPOSITORY=owner/name
        if let Some(slug) = env.get("PYSHIP_REPOSITORY") {
            let (owner, name) = slug.split_once('/').ok_or_else(|| {
                ReleaseError::Config(format!("PYSHIP_REPOSITORY must be owner/name, got {}", slug))
            })?;
            let repository = config.repository.get_or_insert_with(Default::default);
            repository.owner = Some(owner.to_string());
            repository.name = Some(name.to_string());
        }

        Ok(())
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<ShipConfig>) -> ShipConfig {
        let mut result = ShipConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, section by section
    fn merge_into(target: &mut ShipConfig, source: ShipConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if source.package.is_some() {
            target.package = source.package;
        }

        if source.repository.is_some() {
            target.repository = source.repository;
        }

        if source.release.is_some() {
            target.release = source.release;
        }

        if source.quality.is_some() {
            target.quality = source.quality;
        }

        if source.content.is_some() {
            target.content = source.content;
        }

        if source.verify.is_some() {
            target.verify = source.verify;
        }
    }

    /// Expand `${VAR}` references in free-text fields
    fn expand_env_vars(mut config: ShipConfig, env: &HashMap<String, String>) -> ShipConfig {
        if let Some(repository) = &mut config.repository {
            if let Some(description) = &repository.description {
                repository.description = Some(Self::expand_string(description, env));
            }
            if let Some(homepage) = &repository.homepage {
                repository.homepage = Some(Self::expand_string(homepage, env));
            }
        }

        if let Some(release) = &mut config.release
            && let Some(notes) = &release.notes
        {
            release.notes = Some(Self::expand_string(notes, env));
        }

        config
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        ENV_VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| match env.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    warn!("Environment variable {} not found", &caps[1]);
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Validate configuration
    pub fn validate(config: &ShipConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
            });
        } else if config.version != SCHEMA_VERSION {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some(format!(
                    "Currently supported version is \"{}\" only",
                    SCHEMA_VERSION
                )),
            });
        }

        Self::validate_package(&config.package(), &mut errors, &mut warnings);
        Self::validate_repository(&config.repository(), &mut errors, &mut warnings);

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn validate_package(
        package: &PackageConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if package.name.as_deref().is_none_or(str::is_empty) {
            errors.push(ConfigValidationError {
                field: "package.name".to_string(),
                message: "package name is required".to_string(),
            });
        }

        match package.version.as_deref() {
            None | Some("") => errors.push(ConfigValidationError {
                field: "package.version".to_string(),
                message: "package version is required".to_string(),
            }),
            Some(version) => {
                if let Some(reason) = VersionValidator::new().semver_error(version) {
                    warnings.push(ConfigValidationWarning {
                        field: "package.version".to_string(),
                        message: format!("{} is not a semantic version ({})", version, reason),
                        suggestion: Some(
                            "MAJOR.MINOR.PATCH keeps tags and indexes in step".to_string(),
                        ),
                    });
                }
            }
        }

        for (i, file) in package.required_files().iter().enumerate() {
            if file.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("package.requiredFiles[{}]", i),
                    message: "empty path".to_string(),
                });
            }
        }
    }

    fn validate_repository(
        repository: &RepositoryConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        match repository.owner.as_deref() {
            None => warnings.push(ConfigValidationWarning {
                field: "repository.owner".to_string(),
                message: "no repository owner configured".to_string(),
                suggestion: Some("GitHub steps need repository.owner".to_string()),
            }),
            Some(owner) if owner.trim().is_empty() => errors.push(ConfigValidationError {
                field: "repository.owner".to_string(),
                message: "repository owner is empty".to_string(),
            }),
            Some(_) => {}
        }

        for (i, label) in repository.labels.iter().enumerate() {
            if !LABEL_COLOR_REGEX.is_match(&label.color) {
                errors.push(ConfigValidationError {
                    field: format!("repository.labels[{}].color", i),
                    message: format!("{:?} is not a 6-digit hex color", label.color),
                });
            }
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
