//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::agents::backend::AiBackendConfig;
use crate::agents::AgentMode;
use crate::extract::normalize::DEFAULT_MAX_ALTERNATIVES;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// AI backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Backend type: "ollama", "runner" or "anthropic"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL for the AI service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Env var holding the API key (runner/anthropic)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout in seconds, applied per request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// MCP tool servers offered to the supplier search agent
    #[serde(default = "default_web_search_tools")]
    pub web_search_tools: Vec<String>,
}

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_api_key_env() -> String {
    "DEDALUS_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_web_search_tools() -> Vec<String> {
    vec!["windsor/brave-search-mcp".to_string()]
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout(),
            web_search_tools: default_web_search_tools(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolve into a concrete backend configuration.
    pub fn backend_config(&self) -> Result<AiBackendConfig, ConfigError> {
        match self.backend.as_str() {
            "ollama" => Ok(AiBackendConfig::Ollama {
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                timeout_seconds: self.timeout_seconds,
            }),
            "runner" => Ok(AiBackendConfig::Runner {
                base_url: self.base_url.clone(),
                api_key_env: self.api_key_env.clone(),
                model: self.model.clone(),
                timeout_seconds: self.timeout_seconds,
            }),
            #[cfg(feature = "remote-ai")]
            "anthropic" => Ok(AiBackendConfig::Anthropic {
                api_key_env: self.api_key_env.clone(),
                model: self.model.clone(),
                timeout_seconds: self.timeout_seconds,
            }),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown AI backend: {}",
                other
            ))),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Request body cap, sized for scanned PDF receipts
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Supplier search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

fn default_max_alternatives() -> usize {
    DEFAULT_MAX_ALTERNATIVES
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_alternatives: default_max_alternatives(),
        }
    }
}

/// Receipt archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_receipts_dir")]
    pub receipts_dir: PathBuf,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_receipts_dir() -> PathBuf {
    PathBuf::from("./receipts")
}

fn default_true() -> bool {
    true
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            receipts_dir: default_receipts_dir(),
            enabled: true,
        }
    }
}

/// Knot payment-aggregator settings. Secrets come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnotConfig {
    #[serde(default = "default_knot_base_url")]
    pub base_url: String,

    #[serde(default = "default_knot_version")]
    pub version: String,

    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    #[serde(default = "default_sync_url")]
    pub sync_url: String,

    #[serde(default = "default_knot_timeout")]
    pub timeout_seconds: u64,

    /// Upper bound on the `limit` of a transaction sync
    #[serde(default = "default_max_sync_limit")]
    pub max_sync_limit: u32,
}

fn default_knot_base_url() -> String {
    "https://development.knotapi.com".to_string()
}

fn default_knot_version() -> String {
    "2.0".to_string()
}

fn default_client_id_env() -> String {
    "KNOT_CLIENT_ID".to_string()
}

fn default_secret_env() -> String {
    "KNOT_SECRET".to_string()
}

fn default_sync_url() -> String {
    "https://knot.tunnel.tel/transactions/sync".to_string()
}

fn default_knot_timeout() -> u64 {
    10
}

fn default_max_sync_limit() -> u32 {
    100
}

impl Default for KnotConfig {
    fn default() -> Self {
        Self {
            base_url: default_knot_base_url(),
            version: default_knot_version(),
            client_id_env: default_client_id_env(),
            secret_env: default_secret_env(),
            sync_url: default_sync_url(),
            timeout_seconds: default_knot_timeout(),
            max_sync_limit: default_max_sync_limit(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: AgentMode,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Replaces the embedded demo fixtures when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures_path: Option<PathBuf>,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub knot: KnotConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: AgentMode::default(),
            log_level: default_log_level(),
            fixtures_path: None,
            ai: AiConfig::default(),
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            storage: StorageSettings::default(),
            knot: KnotConfig::default(),
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    ///
    /// Runs before logging is set up, so the source is returned for the
    /// caller to report.
    pub fn load_or_default(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        if path.exists() {
            Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf())))
        } else {
            Ok((Self::default(), ConfigSource::Defaults))
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "AI timeout must be greater than 0".to_string(),
            ));
        }

        if self.knot.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Knot timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.knot.max_sync_limit == 0 {
            return Err(ConfigError::ValidationError(
                "max_sync_limit must be greater than 0".to_string(),
            ));
        }

        if self.search.max_alternatives == 0 {
            return Err(ConfigError::ValidationError(
                "max_alternatives must be greater than 0".to_string(),
            ));
        }

        self.ai.backend_config()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.mode, AgentMode::Demo);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ai.backend, "ollama");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.search.max_alternatives, 5);
        assert_eq!(config.knot.version, "2.0");
        assert_eq!(config.knot.max_sync_limit, 100);
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.ai.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_cap() {
        let mut config = AppConfig::default();
        config.search.max_alternatives = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.ai.backend = "gpt-cloud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            mode = "live"

            [ai]
            backend = "runner"
            base_url = "https://api.dedaluslabs.ai"
            model = "openai/gpt-5"

            [search]
            max_alternatives = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, AgentMode::Live);
        assert_eq!(config.search.max_alternatives, 3);
        assert_eq!(config.ai.api_key_env, "DEDALUS_API_KEY");
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(matches!(
            config.ai.backend_config().unwrap(),
            AiBackendConfig::Runner { .. }
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, source) =
            AppConfig::load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.mode, AgentMode::Demo);
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(source.to_string(), "built-in defaults");
    }

    #[test]
    fn test_load_or_default_reports_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "mode = \"live\"\n[knot]\nmax_sync_limit = 20\n").unwrap();

        let (config, source) = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.mode, AgentMode::Live);
        assert_eq!(config.knot.max_sync_limit, 20);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = AppConfig::default();
        config.server.max_upload_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.knot.max_sync_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.storage.receipts_dir, parsed.storage.receipts_dir);
        assert_eq!(config.ai.web_search_tools, parsed.ai.web_search_tools);
    }
}
