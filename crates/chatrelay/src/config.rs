use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{Endpoints, GROQ_BASE_URL, OPENAI_BASE_URL, ProviderCredentials};

pub const DEFAULT_CONFIG_FILE: &str = "chatrelay.yaml";
pub const DEFAULT_DOTENV_FILE: &str = ".env";

pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const PORT_VAR: &str = "PORT";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }

    /// Overlay environment values: `PORT` and provider keys.
    ///
    /// Empty values are ignored.
    pub fn apply_env(&mut self, env: &Environment) -> Result<(), ConfigError> {
        if let Some(port) = env.get(PORT_VAR) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        }
        if let Some(key) = env.get(GROQ_API_KEY_VAR) {
            self.credentials.groq_api_key = Some(key.to_string());
        }
        if let Some(key) = env.get(OPENAI_API_KEY_VAR) {
            self.credentials.openai_api_key = Some(key.to_string());
        }
        Ok(())
    }

    pub fn provider_credentials(&self) -> ProviderCredentials {
        ProviderCredentials::new(
            self.credentials.groq_api_key.clone(),
            self.credentials.openai_api_key.clone(),
        )
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Directory served for requests the API routes do not claim.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_request_timeout() -> u64 {
    300
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

// ============================================================================
// UpstreamConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            groq_base_url: default_groq_base_url(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            openai_base_url: self.openai_base_url.clone(),
            groq_base_url: self.groq_base_url.clone(),
        }
    }
}

fn default_openai_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

fn default_groq_base_url() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_upstream_timeout() -> u64 {
    120
}

// ============================================================================
// CredentialsConfig
// ============================================================================

/// Keys from the config file. Environment values take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

// ============================================================================
// Environment
// ============================================================================

/// Process environment plus an optional `.env` file, captured once at startup.
///
/// `.env` entries win over process variables.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    dotenv: HashMap<String, String>,
    process: HashMap<String, String>,
}

impl Environment {
    pub fn new(dotenv: HashMap<String, String>, process: HashMap<String, String>) -> Self {
        Self { dotenv, process }
    }

    /// Capture the process environment and the `.env` file at `dotenv_path`.
    ///
    /// A missing `.env` file is not an error.
    pub async fn capture(dotenv_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dotenv = match fs::read_to_string(dotenv_path.as_ref()).await {
            Ok(contents) => parse_dotenv(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let process = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Ok(Self::new(dotenv, process))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.dotenv
            .get(key)
            .or_else(|| self.process.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn has_dotenv(&self) -> bool {
        !self.dotenv.is_empty()
    }
}

/// Parse `KEY=VALUE` lines. Blank lines, `#` comments and lines without a
/// value are skipped; keys and values are trimmed.
pub fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() || key.starts_with('#') {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

// ============================================================================
// Tests
// ============================================================================
