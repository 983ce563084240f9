use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::Operation;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";
pub const PORT_ENV: &str = "PORT";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
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

    /// Apply `GEMINI_API_KEY`, `GEMINI_MODEL` and `PORT` on top of the file values.
    ///
    /// Empty variables are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.upstream.api_key = Some(key);
        }
        if let Some(model) = get(MODEL_ENV) {
            self.upstream.model = model;
        }
        if let Some(port) = get(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port))?;
        }
        Ok(())
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
    /// Upper bound on requests served at once. Unlimited when unset.
    #[serde(default)]
    pub max_concurrent_requests: Option<usize>,
    /// Include a `raw` diagnostic field in 500 responses.
    #[serde(default)]
    pub expose_error_detail: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            max_concurrent_requests: None,
            expose_error_detail: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    120
}

// ============================================================================
// UpstreamConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
    /// Disable TLS certificate verification for the relay's own client.
    /// Intended for local development against intercepting proxies only.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,
    #[serde(default)]
    pub api_versions: ApiVersions,
    #[serde(default)]
    pub legacy_text: LegacyTextConfig,
    /// Only ever populated from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            operation: Operation::default(),
            timeout_seconds: default_upstream_timeout(),
            danger_accept_invalid_certs: false,
            api_versions: ApiVersions::default(),
            legacy_text: LegacyTextConfig::default(),
            api_key: None,
        }
    }
}

impl UpstreamConfig {
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key.clone().ok_or(ConfigError::MissingApiKey)
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

// ============================================================================
// ApiVersions
// ============================================================================

/// API version path segment per model family.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiVersions {
    #[serde(default = "default_gemini_1_version")]
    pub gemini_1: String,
    #[serde(default = "default_beta_version")]
    pub gemini_2: String,
    #[serde(default = "default_beta_version")]
    pub fallback: String,
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            gemini_1: default_gemini_1_version(),
            gemini_2: default_beta_version(),
            fallback: default_beta_version(),
        }
    }
}

fn default_gemini_1_version() -> String {
    "v1".to_string()
}

fn default_beta_version() -> String {
    "v1beta".to_string()
}

// ============================================================================
// LegacyTextConfig
// ============================================================================

/// Sampling parameters sent with `:generateText` requests.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct LegacyTextConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for LegacyTextConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    512
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

    #[error("missing GEMINI_API_KEY in environment")]
    MissingApiKey,

    #[error("invalid PORT value: {0:?}")]
    InvalidPort(String),

    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("upstream base url cannot carry a path: {0}")]
    UnsupportedBaseUrl(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_seconds, 120);
        assert_eq!(config.server.max_concurrent_requests, None);
        assert!(!config.server.expose_error_detail);
        assert_eq!(
            config.upstream.base_url,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.upstream.model, "gemini-1.5-pro");
        assert_eq!(config.upstream.operation, Operation::GenerateContent);
        assert_eq!(config.upstream.timeout_seconds, 30);
        assert!(!config.upstream.danger_accept_invalid_certs);
        assert_eq!(config.upstream.api_versions.gemini_1, "v1");
        assert_eq!(config.upstream.api_versions.gemini_2, "v1beta");
        assert_eq!(config.upstream.api_versions.fallback, "v1beta");
        assert!(config.upstream.api_key.is_none());
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let missing_path = tmp_dir.path().join("missing-config.yaml");
        let config = Config::load(&missing_path).await.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.model, "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 3000
  request_timeout_seconds: 60
  max_concurrent_requests: 16
  expose_error_detail: true
upstream:
  base_url: "http://localhost:9999"
  model: "gemini-2.5-flash"
  operation: generate_text
  timeout_seconds: 15
  api_versions:
    gemini_1: v1beta
  legacy_text:
    temperature: 0.2
    max_output_tokens: 64
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_seconds, 60);
        assert_eq!(config.server.max_concurrent_requests, Some(16));
        assert!(config.server.expose_error_detail);
        assert_eq!(config.upstream.base_url, "http://localhost:9999");
        assert_eq!(config.upstream.model, "gemini-2.5-flash");
        assert_eq!(config.upstream.operation, Operation::GenerateText);
        assert_eq!(config.upstream.timeout_seconds, 15);
        assert_eq!(config.upstream.api_versions.gemini_1, "v1beta");
        assert_eq!(config.upstream.api_versions.gemini_2, "v1beta"); // default
        assert_eq!(config.upstream.legacy_text.temperature, 0.2);
        assert_eq!(config.upstream.legacy_text.max_output_tokens, 64);
    }

    #[tokio::test]
    async fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 9000
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0"); // default
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.upstream.timeout_seconds, 30); // default
        assert_eq!(config.upstream.operation, Operation::GenerateContent); // default
    }

    #[tokio::test]
    async fn test_api_key_in_file_is_ignored() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
upstream:
  api_key: "from-file"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert!(config.upstream.api_key.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(file.path()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GEMINI_API_KEY", "secret"),
                ("GEMINI_MODEL", "gemini-2.0-flash"),
                ("PORT", "3001"),
            ]))
            .unwrap();

        assert_eq!(config.upstream.api_key.as_deref(), Some("secret"));
        assert_eq!(config.upstream.model, "gemini-2.0-flash");
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_apply_env_empty_values_are_unset() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("GEMINI_API_KEY", ""), ("GEMINI_MODEL", "")]))
            .unwrap();

        assert!(config.upstream.api_key.is_none());
        assert_eq!(config.upstream.model, "gemini-1.5-pro");
        assert!(matches!(
            config.upstream.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_apply_env_invalid_port() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(ref p) if p == "eighty"));
    }

    #[test]
    fn test_config_error_display() {
        let io_error = ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "test",
        ));
        assert!(io_error.to_string().contains("failed to read config file"));
        assert_eq!(
            ConfigError::MissingApiKey.to_string(),
            "missing GEMINI_API_KEY in environment"
        );
    }
}
