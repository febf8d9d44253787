//! Configuration management for the Campus Assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.campus/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Engine tuning (thresholds, windows, keyword lists, language set) lives in
//! [`EngineConfig`], an explicit structure validated at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .campus/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider (e.g., "ollama")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// Optional provider endpoint override
    pub endpoint: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations
    pub llm: Option<LlmConfig>,

    /// Conversation engine configuration
    pub engine: EngineConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
    },
}

/// Tuning for the conversation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub escalation: EscalationConfig,
    pub session: SessionConfig,
    pub retrieval: RetrievalConfig,
    pub languages: LanguageConfig,
    pub providers: ProviderCallConfig,
    pub suggestions: SuggestionConfig,
    pub storage: StorageConfig,
}

/// When a turn must be handed to a human.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EscalationConfig {
    /// Turns below this confidence escalate immediately
    pub confidence_threshold: u8,

    /// Turns below this confidence count towards the low-confidence streak
    pub low_confidence_ceiling: u8,

    /// Streak length (including the current turn) that forces escalation
    pub consecutive_low_limit: u32,

    /// Phrases in the pivot-language query that force escalation
    pub trigger_keywords: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50,
            low_confidence_ceiling: 60,
            consecutive_low_limit: 3,
            trigger_keywords: [
                "complaint",
                "grievance",
                "urgent",
                "emergency",
                "fee refund",
                "ragging",
                "harassment",
                "legal",
                "document verification",
                "certificate issue",
                "talk to a human",
                "speak to a human",
                "human agent",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Session lifecycle and prompt window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of user/assistant exchanges included in generation prompts
    pub active_window_exchanges: usize,

    /// Inactivity after which a session is considered idle
    pub idle_after_secs: u64,

    /// Inactivity after which a session expires
    pub expire_after_secs: u64,

    /// Period of the background expiry sweep
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            active_window_exchanges: 5,
            idle_after_secs: 30 * 60,
            expire_after_secs: 24 * 60 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

/// Retrieval and indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned per query
    pub top_k: usize,

    /// Minimum normalized score for a result to be returned
    pub min_relevance: f32,

    /// Additive bonus for FAQ keyword matches (result capped at 1.0)
    pub keyword_bonus: f32,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Document chunk size in characters
    pub chunk_size: usize,

    /// Overlap between document chunks in characters
    pub chunk_overlap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_relevance: 0.30,
            keyword_bonus: 0.20,
            embedding: EmbeddingSettings::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
        }
    }
}

/// Language handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LanguageConfig {
    /// Supported language codes
    pub supported: Vec<String>,

    /// Fallback when detection fails and the session has no language
    pub default: String,

    /// Language used internally for retrieval and generation
    pub pivot: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            supported: ["en", "hi", "raj", "gu", "mr", "pa", "ta"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default: "en".to_string(),
            pivot: "en".to_string(),
        }
    }
}

impl LanguageConfig {
    /// Whether `code` is one of the configured languages.
    pub fn is_supported(&self, code: &str) -> bool {
        self.supported.iter().any(|c| c == code)
    }
}

/// Timeout and retry policy shared by provider calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderCallConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl Default for ProviderCallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_retries: 2,
            retry_base_backoff_ms: 250,
        }
    }
}

/// Follow-up suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionConfig {
    pub max: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self { max: 5 }
    }
}

/// Persistent storage location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path; `:memory:` keeps everything in process.
    /// Defaults to `<workspace>/.campus/campus.db`.
    pub database: Option<String>,
}

impl EngineConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> AppResult<()> {
        let esc = &self.escalation;
        if esc.confidence_threshold > 100 || esc.low_confidence_ceiling > 100 {
            return Err(AppError::Config(
                "Confidence thresholds must be within 0..=100".to_string(),
            ));
        }
        if esc.low_confidence_ceiling < esc.confidence_threshold {
            return Err(AppError::Config(format!(
                "low_confidence_ceiling ({}) must not be below confidence_threshold ({})",
                esc.low_confidence_ceiling, esc.confidence_threshold
            )));
        }
        if esc.consecutive_low_limit == 0 {
            return Err(AppError::Config(
                "consecutive_low_limit must be at least 1".to_string(),
            ));
        }

        let session = &self.session;
        if session.active_window_exchanges == 0 {
            return Err(AppError::Config(
                "active_window_exchanges must be at least 1".to_string(),
            ));
        }
        if session.expire_after_secs < session.idle_after_secs {
            return Err(AppError::Config(
                "expire_after_secs must not be shorter than idle_after_secs".to_string(),
            ));
        }

        let retrieval = &self.retrieval;
        if !(0.0..=1.0).contains(&retrieval.min_relevance) {
            return Err(AppError::Config(format!(
                "min_relevance must be within [0, 1], got {}",
                retrieval.min_relevance
            )));
        }
        if retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(AppError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }

        let languages = &self.languages;
        for code in [&languages.default, &languages.pivot] {
            if !languages.is_supported(code) {
                return Err(AppError::Config(format!(
                    "Language '{}' is not in the supported set: {}",
                    code,
                    languages.supported.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    engine: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: None,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `CAMPUS_WORKSPACE`: Override workspace path
    /// - `CAMPUS_CONFIG`: Path to config file
    /// - `CAMPUS_PROVIDER`: Generation provider
    /// - `CAMPUS_MODEL`: Model identifier
    /// - `CAMPUS_LLM_ENDPOINT`: Provider endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CAMPUS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CAMPUS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".campus/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CAMPUS_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CAMPUS_MODEL") {
            config.model = model;
        }

        if let Ok(endpoint) = std::env::var("CAMPUS_LLM_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.engine.validate()?;
        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(ProviderConfig::Ollama {
                endpoint, model, ..
            }) = llm.providers.get(&llm.active_provider)
            {
                result.model = model.clone();
                result.endpoint = Some(endpoint.clone());
            }

            result.llm = Some(llm);
        }

        if let Some(engine) = config_file.engine {
            result.engine = engine;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
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
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .campus directory.
    pub fn campus_dir(&self) -> PathBuf {
        self.workspace.join(".campus")
    }

    /// Ensure the .campus directory exists.
    pub fn ensure_campus_dir(&self) -> AppResult<()> {
        let campus_dir = self.campus_dir();
        if !campus_dir.exists() {
            std::fs::create_dir_all(&campus_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .campus directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory searched for prompt definitions.
    pub fn prompts_dir(&self) -> PathBuf {
        self.campus_dir().join("prompts")
    }

    /// Resolved SQLite location, or `None` for in-memory storage.
    pub fn database_path(&self) -> Option<PathBuf> {
        match self.engine.storage.database.as_deref() {
            Some(":memory:") => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(self.campus_dir().join("campus.db")),
        }
    }

    /// Embedding model for the active provider, if configured.
    pub fn embedding_model(&self) -> Option<String> {
        let llm = self.llm.as_ref()?;
        match llm.providers.get(&llm.active_provider)? {
            ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.clone(),
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        self.engine.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.escalation.confidence_threshold, 50);
        assert_eq!(engine.escalation.consecutive_low_limit, 3);
        assert_eq!(engine.session.active_window_exchanges, 5);
        assert_eq!(engine.retrieval.top_k, 5);
        assert_eq!(engine.languages.pivot, "en");
        assert!(engine.languages.is_supported("hi"));
        assert!(!engine.languages.is_supported("fr"));
        assert_eq!(engine.providers.max_retries, 2);
    }

    #[test]
    fn test_campus_dir() {
        let config = AppConfig::default();
        assert!(config.campus_dir().ends_with(".campus"));
        assert!(config.prompts_dir().ends_with("prompts"));
    }

    #[test]
    fn test_database_path_resolution() {
        let mut config = AppConfig::default();
        assert!(config.database_path().unwrap().ends_with("campus.db"));

        config.engine.storage.database = Some(":memory:".to_string());
        assert!(config.database_path().is_none());

        config.engine.storage.database = Some("/tmp/x.db".to_string());
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("mistral".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.model, "mistral");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ceiling_below_threshold() {
        let mut engine = EngineConfig::default();
        engine.escalation.low_confidence_ceiling = 40;
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsupported_pivot() {
        let mut engine = EngineConfig::default();
        engine.languages.pivot = "fr".to_string();
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_floor_out_of_range() {
        let mut engine = EngineConfig::default();
        engine.retrieval.min_relevance = 1.5;
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_merge_yaml_engine_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
logging:
  level: debug
  format: json
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: qwen2.5
      embeddingModel: nomic-embed-text
engine:
  escalation:
    confidence_threshold: 40
  retrieval:
    top_k: 3
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.log_format, "json");
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(merged.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(merged.embedding_model().as_deref(), Some("nomic-embed-text"));
        assert_eq!(merged.engine.escalation.confidence_threshold, 40);
        // Unspecified fields keep their defaults
        assert_eq!(merged.engine.escalation.consecutive_low_limit, 3);
        assert_eq!(merged.engine.retrieval.top_k, 3);
        assert_eq!(merged.engine.retrieval.min_relevance, 0.30);
    }
}
