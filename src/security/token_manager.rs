//! Secure token manager with memory-safe handling and masking capabilities
//!
//! Upload and hosting credentials are read from the environment into
//! `secrecy::SecretString` values so they never end up in logs. The upload
//! tool receives them through its own environment variables.

use crate::core::error::ReleaseError;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Credential sources, first variable found wins
const REGISTRY_TOKENS: &[(&str, &[&str])] = &[
    ("pypi", &["PYPI_TOKEN"]),
    ("testpypi", &["TEST_PYPI_TOKEN"]),
    ("github", &["GH_TOKEN", "GITHUB_TOKEN"]),
];

/// Username twine expects when the password is an API token
const TOKEN_USERNAME: &str = "__token__";

/// Where upload credentials come from, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Token(String),
    TwineEnv,
    Pypirc(PathBuf),
    Missing,
}

/// Secure token manager for package index and hosting authentication
///
/// # Examples
///
/// ```
/// use pyship::security::SecureTokenManager;
///
/// let manager = SecureTokenManager::from_env();
/// if let Some(token) = manager.get_token("pypi") {
///     let shown = manager.mask_token(secrecy::ExposeSecret::expose_secret(&token));
///     println!("PyPI token found: {}", shown);
/// }
/// ```
#[derive(Default)]
pub struct SecureTokenManager {
    vars: HashMap<String, String>,
}

impl SecureTokenManager {
    /// Snapshot the process environment
    pub fn from_env() -> Self {
        Self::with_vars(env::vars().collect())
    }

    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Retrieves the token for a registry, `None` if unknown or unset
    pub fn get_token(&self, registry_name: &str) -> Option<SecretString> {
        let (_, names) = REGISTRY_TOKENS.iter().find(|(r, _)| *r == registry_name)?;
        names
            .iter()
            .filter_map(|name| self.vars.get(*name))
            .find(|value| !value.is_empty())
            .map(|value| SecretString::new(value.clone().into()))
    }

    pub fn has_token(&self, registry_name: &str) -> bool {
        self.get_token(registry_name).is_some()
    }

    /// Environment for `twine upload`
    ///
    /// An index token becomes `TWINE_USERNAME=__token__` and
    /// `TWINE_PASSWORD=<token>`. Without a token the list is empty and twine
    /// falls back to its own configuration.
    pub fn upload_env(&self, test_index: bool) -> Vec<(String, SecretString)> {
        match self.get_token(Self::index_registry(test_index)) {
            Some(token) => vec![
                (
                    "TWINE_USERNAME".to_string(),
                    SecretString::new(TOKEN_USERNAME.into()),
                ),
                ("TWINE_PASSWORD".to_string(), token),
            ],
            None => Vec::new(),
        }
    }

    /// Where twine will get its credentials from
    pub fn upload_credentials(&self, test_index: bool) -> CredentialSource {
        let registry = Self::index_registry(test_index);
        if self.has_token(registry) {
            let name = self.get_token_name(registry).unwrap_or_default();
            return CredentialSource::Token(name.to_string());
        }
        if self.vars.get("TWINE_PASSWORD").is_some_and(|v| !v.is_empty()) {
            return CredentialSource::TwineEnv;
        }
        if let Some(home) = self.vars.get("HOME") {
            let pypirc = PathBuf::from(home).join(".pypirc");
            if pypirc.is_file() {
                return CredentialSource::Pypirc(pypirc);
            }
        }
        CredentialSource::Missing
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters. Tokens shorter than 10
    /// characters are fully masked as "****".
    ///
    /// ```
    /// use pyship::security::SecureTokenManager;
    ///
    /// let manager = SecureTokenManager::default();
    /// assert_eq!(manager.mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(manager.mask_token("short"), "****");
    /// ```
    pub fn mask_token(&self, token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 10 {
            return "****".to_string();
        }

        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks every known token occurring in `text`
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        let mut masked = text.to_string();

        for (registry_name, _) in REGISTRY_TOKENS {
            if let Some(token) = self.get_token(registry_name) {
                let token_str = token.expose_secret();
                if let Ok(regex) = Regex::new(&regex::escape(token_str)) {
                    let masked_token = self.mask_token(token_str);
                    masked = regex
                        .replace_all(&masked, masked_token.as_str())
                        .to_string();
                }
            }
        }

        masked
    }

    /// Name of the variable that currently provides the registry's token
    pub fn get_token_name(&self, registry_name: &str) -> Option<&'static str> {
        let (_, names) = REGISTRY_TOKENS.iter().find(|(r, _)| *r == registry_name)?;
        names
            .iter()
            .copied()
            .find(|name| self.vars.get(*name).is_some_and(|v| !v.is_empty()))
            .or_else(|| names.first().copied())
    }

    /// Mask known tokens in the captured output carried by `error`
    pub fn mask_error(&self, error: ReleaseError) -> ReleaseError {
        match error {
            ReleaseError::CommandFailed {
                step,
                command,
                stderr,
            } => ReleaseError::CommandFailed {
                step,
                command,
                stderr: self.mask_tokens_in_string(&stderr),
            },
            ReleaseError::VerificationFailed { target, message } => {
                ReleaseError::VerificationFailed {
                    target,
                    message: self.mask_tokens_in_string(&message),
                }
            }
            other => other,
        }
    }

    fn index_registry(test_index: bool) -> &'static str {
        if test_index { "testpypi" } else { "pypi" }
    }
}
