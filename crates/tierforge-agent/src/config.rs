//! Pipeline configuration
//!
//! Resolution order, later wins: built-in defaults, an optional TOML file
//! (`TIERFORGE_CONFIG` or `./tierforge.toml`), then environment variables.
//! A `.env` file is honoured through `dotenvy`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tierforge_core::ConfigurationError;

use crate::invoker::InvocationParams;

pub const ENV_CONFIG_PATH: &str = "TIERFORGE_CONFIG";
pub const ENV_ENDPOINT: &str = "TIERFORGE_LLM_ENDPOINT";
pub const ENV_API_KEY: &str = "TIERFORGE_LLM_API_KEY";
pub const ENV_MODEL: &str = "TIERFORGE_LLM_MODEL";
pub const ENV_AUTH: &str = "TIERFORGE_LLM_AUTH";
pub const ENV_MAX_TOKENS: &str = "TIERFORGE_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "TIERFORGE_TEMPERATURE";
pub const ENV_TIMEOUT_SECS: &str = "TIERFORGE_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "TIERFORGE_MAX_ATTEMPTS";

const DEFAULT_CONFIG_FILE: &str = "tierforge.toml";

/// How the API key is presented to the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `api-key: <key>` (Azure OpenAI deployments)
    ApiKey,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "api-key" | "api_key" | "apikey" => Ok(AuthScheme::ApiKey),
            other => Err(format!("expected \"bearer\" or \"api-key\", got {:?}", other)),
        }
    }
}

/// Where and how to reach the chat-completion service
#[derive(Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Model or deployment identifier, omitted from the request when `None`
    pub model: Option<String>,
    pub auth: AuthScheme,
}

impl ModelConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: None,
            auth: AuthScheme::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Generation and retry tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Total network attempts per generation, including the first
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            temperature: 0.7,
            timeout_secs: 120,
            max_attempts: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Never fewer than one attempt
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Pause before the next attempt; grows linearly with the attempt number
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff().saturating_mul(attempt)
    }

    pub fn invocation_params(&self) -> InvocationParams {
        InvocationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout(),
        }
    }
}

/// Everything the orchestrator needs to run against a live model
#[derive(Debug, Clone, PartialEq)]
pub struct TierforgeConfig {
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
}

/// Shape of `tierforge.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    model: FileModelSection,
    pipeline: PipelineConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileModelSection {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    auth: Option<AuthScheme>,
}

impl TierforgeConfig {
    /// Load `.env`, the optional config file and the process environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", error);
            }
        }
        Self::load(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let file = match config_file_path(&lookup) {
            Some(path) => Self::read_file(&path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, &lookup)
    }

    /// Load a TOML config file, then apply environment overrides
    pub fn from_file(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let file = Self::read_file(path)?;
        Self::resolve(file, &lookup)
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::invalid(&path.display().to_string(), format!("unreadable: {}", e))
        })?;
        let file: FileConfig = toml::from_str(&content)
            .map_err(|e| ConfigurationError::invalid(&path.display().to_string(), e))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(file)
    }

    fn resolve(
        file: FileConfig,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = non_empty(ENV_ENDPOINT)
            .or(file.model.endpoint)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigurationError::missing(ENV_ENDPOINT))?;
        let api_key = non_empty(ENV_API_KEY)
            .or(file.model.api_key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigurationError::missing(ENV_API_KEY))?;
        let model = non_empty(ENV_MODEL).or(file.model.model);
        let auth = match parse_var::<AuthScheme>(lookup, ENV_AUTH)? {
            Some(auth) => auth,
            None => file.model.auth.unwrap_or_default(),
        };

        let mut pipeline = file.pipeline;
        if let Some(max_tokens) = parse_var(lookup, ENV_MAX_TOKENS)? {
            pipeline.max_tokens = max_tokens;
        }
        if let Some(temperature) = parse_var(lookup, ENV_TEMPERATURE)? {
            pipeline.temperature = temperature;
        }
        if let Some(timeout_secs) = parse_var(lookup, ENV_TIMEOUT_SECS)? {
            pipeline.timeout_secs = timeout_secs;
        }
        if let Some(max_attempts) = parse_var(lookup, ENV_MAX_ATTEMPTS)? {
            pipeline.max_attempts = max_attempts;
        }
        pipeline.max_attempts = pipeline.attempts();
        if pipeline.timeout_secs == 0 {
            return Err(ConfigurationError::invalid(ENV_TIMEOUT_SECS, "must be positive"));
        }

        Ok(Self {
            model: ModelConfig {
                endpoint: endpoint.trim().to_string(),
                api_key: api_key.trim().to_string(),
                model,
                auth,
            },
            pipeline,
        })
    }
}

fn config_file_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = lookup(ENV_CONFIG_PATH).filter(|p| !p.trim().is_empty()) {
        // An explicit path that does not exist is reported by read_file
        return Some(PathBuf::from(path));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    default_path.exists().then_some(default_path)
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigurationError::invalid(name, e)),
        _ => Ok(None),
    }
}
