//! Configuration management for tripweave.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.tripweave/config.yaml` or `TRIPWEAVE_CONFIG`)
//! - Environment variables (`TRIPWEAVE_*`)
//! - Command-line flags
//!
//! The workspace directory holds all state under `.tripweave/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default OpenAI-compatible endpoint (Qianfan v2).
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://qianfan.baidubce.com/v2";

/// Default generative model on the OpenAI-compatible endpoint.
pub const DEFAULT_OPENAI_MODEL: &str = "ernie-speed-8k";

/// Environment variable holding the default API key.
pub const DEFAULT_API_KEY_ENV: &str = "QIANFAN_API_KEY";

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for generative calls, in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .tripweave/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active generative provider ("openai" or "ollama")
    pub provider: String,

    /// Active generative model
    pub model: String,

    /// Explicit API key (`TRIPWEAVE_API_KEY`), wins over `apiKeyEnv`
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generative provider configurations
    pub llm: LlmConfig,

    /// Embedding backend configuration
    pub embedding: EmbeddingSettings,

    /// Store directory override
    pub store_dir: Option<PathBuf>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig::OpenAI {
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
                endpoint: Some(DEFAULT_OPENAI_ENDPOINT.to_string()),
                timeout: Some(DEFAULT_LLM_TIMEOUT_SECS),
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig::Ollama {
                endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
                model: "qwen2.5".to_string(),
                timeout: Some(DEFAULT_LLM_TIMEOUT_SECS),
            },
        );

        Self {
            active_provider: "openai".to_string(),
            providers,
        }
    }
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Endpoint configured for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            Self::OpenAI { timeout, .. } | Self::Ollama { timeout, .. } => {
                timeout.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS)
            }
        }
    }
}

/// Embedding backend settings.
///
/// The embedding identity (provider, model, dimensions) is pinned into every
/// store built with it; changing any of the three requires re-ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(
        rename = "apiKeyEnv",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key_env: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSettings>,
    workspace: Option<WorkspaceConfig>,
    store: Option<StoreConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreConfig {
    dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: llm.active_provider.clone(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm,
            embedding: EmbeddingSettings::default(),
            store_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `TRIPWEAVE_WORKSPACE`: Override workspace path
    /// - `TRIPWEAVE_CONFIG`: Path to config file
    /// - `TRIPWEAVE_PROVIDER`: Generative provider
    /// - `TRIPWEAVE_MODEL`: Generative model
    /// - `TRIPWEAVE_API_KEY`: API key
    /// - `TRIPWEAVE_STORE`: Store directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("TRIPWEAVE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("TRIPWEAVE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.tripweave_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("TRIPWEAVE_PROVIDER") {
            config.select_provider(&provider);
        }

        if let Ok(model) = std::env::var("TRIPWEAVE_MODEL") {
            config.model = model;
        }

        if let Ok(store) = std::env::var("TRIPWEAVE_STORE") {
            config.store_dir = Some(PathBuf::from(store));
        }

        config.api_key = std::env::var("TRIPWEAVE_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(store) = config_file.store {
            if let Some(dir) = store.dir {
                result.store_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(llm) = config_file.llm {
            let active = llm.active_provider.clone();
            result.llm = llm;
            result.select_provider(&active);
        }

        Ok(result)
    }

    /// Switch the active provider, picking up its configured model.
    fn select_provider(&mut self, provider: &str) {
        self.provider = provider.to_string();
        self.llm.active_provider = provider.to_string();
        if let Some(provider_config) = self.llm.providers.get(provider) {
            self.model = provider_config.model().to_string();
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the environment and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.select_provider(&provider);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .tripweave directory.
    pub fn tripweave_dir(&self) -> PathBuf {
        self.workspace.join(".tripweave")
    }

    /// Ensure the .tripweave directory exists.
    pub fn ensure_tripweave_dir(&self) -> AppResult<()> {
        let dir = self.tripweave_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .tripweave directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory holding the persisted vector store.
    pub fn store_dir(&self) -> PathBuf {
        match &self.store_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.workspace.join(dir),
            None => self.tripweave_dir().join("store"),
        }
    }

    /// Get the configuration of a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(provider)
    }

    /// Resolve the API key for a provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Resolve the API key for the embedding backend.
    pub fn resolve_embedding_api_key(&self) -> Option<String> {
        self.embedding
            .api_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok())
            .or_else(|| self.api_key.clone())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.embedding.dimensions, 384);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_store_dir_defaults_under_tripweave_dir() {
        let config = AppConfig::default();
        assert!(config.store_dir().ends_with(".tripweave/store"));
    }

    #[test]
    fn test_relative_store_dir_resolves_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/trips");
        config.store_dir = Some(PathBuf::from("vector_store"));
        assert_eq!(config.store_dir(), PathBuf::from("/srv/trips/vector_store"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            None,
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "qwen2.5");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_explicit_model_wins_over_provider_model() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            false,
            false,
        );
        assert_eq!(overridden.model, "llama3.2");
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: qwen2.5:14b
embedding:
  provider: trigram
  model: trigram-v1
  dimensions: 128
store:
  dir: data/store
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let mut base = AppConfig::default();
        base.workspace = temp.path().to_path_buf();
        let merged = base.merge_yaml(&path).unwrap();

        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "qwen2.5:14b");
        assert_eq!(merged.embedding.provider, "trigram");
        assert_eq!(merged.embedding.dimensions, 128);
        assert_eq!(merged.store_dir(), temp.path().join("data/store"));
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
        assert_eq!(
            merged.get_provider_config("ollama").unwrap().endpoint(),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            None,
            None,
            false,
            false,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_openai_accepts_explicit_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key("openai").as_deref(), Some("sk-test"));
    }
}
