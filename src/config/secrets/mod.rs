#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use super::{Config, ConfigError};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const PASSWORD_VAR: &str = "APP_PASSWORD";

/// Raw contents of `secrets.toml`
#[derive(Debug, Default, Deserialize)]
pub struct SecretsFile {
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub api_key: Option<String>,
    #[serde(rename = "APP_PASSWORD", default)]
    pub password: Option<String>,
}

impl SecretsFile {
    /// Missing file yields an empty set of secrets
    #[inline]
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read secrets file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {}", path.display()))
    }
}

/// Provider API key and the chat access password.
///
/// Values from `secrets.toml` win over the process environment; blank values count as absent.
#[derive(Clone, Default)]
pub struct Secrets {
    api_key: Option<String>,
    password: Option<String>,
}

impl Secrets {
    #[inline]
    pub fn load(config: &Config) -> Result<Self> {
        let file = SecretsFile::read(&config.secrets_file_path())?;
        Ok(Self::resolve(file, |name| std::env::var(name).ok()))
    }

    #[inline]
    pub fn resolve<F>(file: SecretsFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |from_file: Option<String>, name: &str| {
            non_blank(from_file).or_else(|| non_blank(env(name)))
        };

        Self {
            api_key: pick(file.api_key, API_KEY_VAR),
            password: pick(file.password, PASSWORD_VAR),
        }
    }

    #[inline]
    pub fn new(api_key: Option<String>, password: Option<String>) -> Self {
        Self {
            api_key: non_blank(api_key),
            password: non_blank(password),
        }
    }

    #[inline]
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingSecret(API_KEY_VAR))
    }

    #[inline]
    pub fn require_password(&self) -> Result<&str, ConfigError> {
        self.password
            .as_deref()
            .ok_or(ConfigError::MissingSecret(PASSWORD_VAR))
    }

    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    #[inline]
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Compare a submitted password against the configured one without short-circuiting on content
    #[inline]
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), candidate.as_bytes()))
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| if value.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("api_key", &redact(&self.api_key))
            .field("password", &redact(&self.password))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
