//! Version Validator - package versions and interpreter versions
//!
//! Package versions are checked against Semantic Versioning 2.0.0. Python
//! accepts a broader grammar, so a failure here is only a warning. Interpreter
//! versions come from `python --version` and gate the prerequisites step.
//!
//! # Example
//!
//! ```
//! use pyship::validation::version_validator::VersionValidator;
//!
//! let validator = VersionValidator::new();
//! assert!(validator.semver_error("1.2.3").is_none());
//! assert_eq!(validator.normalize_pep440("1.2.3-rc.1"), "1.2.3rc1");
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use semver::Version;

lazy_static! {
    static ref INTERPRETER_VERSION_REGEX: Regex =
        Regex::new(r"Python (\d+)\.(\d+)(?:\.(\d+))?").unwrap();
    static ref PEP440_REGEX: Regex = Regex::new(
        r"(?ix)^v?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre>a|b|c|rc|alpha|beta|pre|preview)[-_.]?(?P<pre_n>\d*))?
        (?:[-_.]?(?P<post>post|rev|r)[-_.]?(?P<post_n>\d*))?
        (?:[-_.]?(?P<dev>dev)[-_.]?(?P<dev_n>\d*))?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?$"
    )
    .unwrap();
}

/// Validator for package and interpreter versions
#[derive(Default)]
pub struct VersionValidator;

impl VersionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Parse error when `version_str` is not a semantic version
    pub fn semver_error(&self, version_str: &str) -> Option<String> {
        Version::parse(version_str).err().map(|e| e.to_string())
    }

    /// Check if version is a prerelease
    ///
    /// ```
    /// use pyship::validation::version_validator::VersionValidator;
    ///
    /// let validator = VersionValidator::new();
    ///
    /// assert!(validator.is_prerelease("1.0.0-alpha.1"));
    /// assert!(!validator.is_prerelease("1.0.0"));
    /// ```
    pub fn is_prerelease(&self, version_str: &str) -> bool {
        Version::parse(version_str).is_ok_and(|version| !version.pre.is_empty())
    }

    /// Normalized form of a version as the package index reports it
    ///
    /// `1.0.0-rc.1` becomes `1.0.0rc1`, `2.0-beta` becomes `2.0b0` and
    /// `1.0-post.2` becomes `1.0.post2`. Strings outside the grammar are
    /// returned trimmed and lowercased.
    pub fn normalize_pep440(&self, version_str: &str) -> String {
        let trimmed = version_str.trim().to_lowercase();
        let Some(caps) = PEP440_REGEX.captures(&trimmed) else {
            return trimmed;
        };
        let number = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim_start_matches('0'))
                .filter(|n| !n.is_empty())
                .unwrap_or("0")
                .to_string()
        };

        let mut out = caps["release"]
            .split('.')
            .map(|part| {
                let part = part.trim_start_matches('0');
                if part.is_empty() { "0" } else { part }
            })
            .collect::<Vec<_>>()
            .join(".");

        if let Some(pre) = caps.name("pre") {
            let tag = match pre.as_str() {
                "alpha" | "a" => "a",
                "beta" | "b" => "b",
                _ => "rc",
            };
            out.push_str(tag);
            out.push_str(&number("pre_n"));
        }
        if caps.name("post").is_some() {
            out.push_str(".post");
            out.push_str(&number("post_n"));
        }
        if caps.name("dev").is_some() {
            out.push_str(".dev");
            out.push_str(&number("dev_n"));
        }
        if let Some(local) = caps.name("local") {
            out.push('+');
            out.push_str(&local.as_str().replace(['-', '_'], "."));
        }
        out
    }

    /// Whether two version strings name the same release
    pub fn same_release(&self, a: &str, b: &str) -> bool {
        self.normalize_pep440(a) == self.normalize_pep440(b)
    }

    /// Parse the output of `python --version`
    ///
    /// ```
    /// use pyship::validation::VersionValidator;
    /// use semver::Version;
    ///
    /// let validator = VersionValidator::new();
    /// assert_eq!(
    ///     validator.parse_interpreter_version("Python 3.11.4\n"),
    ///     Some(Version::new(3, 11, 4))
    /// );
    /// assert_eq!(validator.parse_interpreter_version("command not found"), None);
    /// ```
    pub fn parse_interpreter_version(&self, output: &str) -> Option<Version> {
        let caps = INTERPRETER_VERSION_REGEX.captures(output)?;
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
        Some(Version::new(part(1)?, part(2)?, part(3).unwrap_or(0)))
    }

    /// Parse a `major.minor[.patch]` minimum such as `3.9`
    pub fn parse_minimum(&self, minimum: &str) -> Option<Version> {
        let mut parts = minimum.trim().split('.').map(|p| p.parse::<u64>().ok());
        let major = parts.next()??;
        let minor = parts.next().unwrap_or(Some(0))?;
        let patch = parts.next().unwrap_or(Some(0))?;
        Some(Version::new(major, minor, patch))
    }

    /// Whether `found` is at least `minimum`; an unparsable minimum never passes
    pub fn meets_minimum(&self, found: &Version, minimum: &str) -> bool {
        self.parse_minimum(minimum)
            .is_some_and(|required| *found >= required)
    }
}
