//! Configuration and credential resolution

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::AnalysisMode;

/// Name of the model API credential, both as env var and secrets key
pub const API_KEY_NAME: &str = "ANTHROPIC_API_KEY";

/// Env var that points at a secrets file
pub const SECRETS_FILE_ENV: &str = "CHIEF_SECRETS_FILE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model API configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Session behaviour
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing sections fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the model API would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(Error::config("llm.model must not be empty"));
        }
        if self.llm.max_tokens == 0 {
            return Err(Error::config("llm.max_tokens must be greater than zero"));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(Error::config(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        Ok(())
    }
}

/// Model API (Anthropic Messages) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Maximum output tokens per reply
    pub max_tokens: u32,
    /// API version header value
    pub api_version: String,
    /// Request timeout in seconds, covering the whole stream
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            api_version: "2023-06-01".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Mode used until the user picks another
    pub default_mode: AnalysisMode,
    /// Directory exports are written to when no path is given
    pub export_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_mode: AnalysisMode::QuickTake,
            export_dir: PathBuf::from("."),
        }
    }
}

/// Where the API key was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Deployment-managed secrets file
    SecretsFile(PathBuf),
    /// Process environment (including a loaded `.env`)
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::SecretsFile(path) => write!(f, "secrets file {}", path.display()),
            CredentialSource::Environment => write!(f, "environment"),
        }
    }
}

/// Resolved model API credential
#[derive(Clone)]
pub struct ApiKey {
    value: String,
    source: CredentialSource,
}

impl ApiKey {
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Looks up the API key: secrets files first, then the environment
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    secrets_files: Vec<PathBuf>,
}

impl CredentialResolver {
    /// Resolver over an explicit list of secrets files, checked in order
    pub fn new(secrets_files: Vec<PathBuf>) -> Self {
        Self { secrets_files }
    }

    /// Default secrets locations.
    ///
    /// `$CHIEF_SECRETS_FILE`, then `./.chief/secrets.toml`, then
    /// `<config dir>/chief-of-staff/secrets.toml`.
    pub fn default_locations() -> Self {
        let mut files = Vec::new();
        if let Ok(path) = std::env::var(SECRETS_FILE_ENV) {
            files.push(PathBuf::from(path));
        }
        files.push(PathBuf::from(".chief").join("secrets.toml"));
        if let Some(dir) = dirs::config_dir() {
            files.push(dir.join("chief-of-staff").join("secrets.toml"));
        }
        Self::new(files)
    }

    /// Secrets files this resolver checks
    pub fn secrets_files(&self) -> &[PathBuf] {
        &self.secrets_files
    }

    /// Resolve against the real process environment, loading `.env` first
    pub fn resolve(&self) -> Result<ApiKey> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup
    pub fn resolve_with<F>(&self, env: F) -> Result<ApiKey>
    where
        F: Fn(&str) -> Option<String>,
    {
        for path in &self.secrets_files {
            match read_secret(path) {
                Ok(Some(value)) => {
                    tracing::info!("Using {} from {}", API_KEY_NAME, path.display());
                    return Ok(ApiKey::new(value, CredentialSource::SecretsFile(path.clone())));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring unreadable secrets file {}: {}", path.display(), e),
            }
        }

        match env(API_KEY_NAME) {
            Some(value) if !value.trim().is_empty() => {
                tracing::info!("Using {} from environment", API_KEY_NAME);
                Ok(ApiKey::new(value.trim(), CredentialSource::Environment))
            }
            _ => Err(Error::MissingCredential(API_KEY_NAME.to_string())),
        }
    }
}

/// Remediation text shown when no credential could be found
pub fn missing_credential_help() -> String {
    format!(
        "{key} not found. Please set it in your environment variables or secrets file.\n\n\
         For local development: create a `.env` file with `{key}=your_key`\n\n\
         For deployment: add `{key} = \"your_key\"` to `.chief/secrets.toml`, \
         or point `{env}` at a secrets file",
        key = API_KEY_NAME,
        env = SECRETS_FILE_ENV
    )
}

fn read_secret(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let secrets: HashMap<String, toml::Value> = toml::from_str(&raw)?;
    Ok(secrets
        .get(API_KEY_NAME)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string))
}
