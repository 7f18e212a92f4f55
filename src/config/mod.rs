//! Configuration management for ragfuse
//!
//! Configuration is read from a TOML file, then environment overrides and an
//! optional named profile are applied, and the result is validated as a whole.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Retrieval strategy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results requested from every similarity search
    pub primary_k: usize,
    /// Maximum number of contexts handed to the answer model
    pub final_k: usize,
    pub enable_query_fusion: bool,
    pub fusion_variant_count: usize,
    pub enable_hyde: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            primary_k: 8,
            final_k: 4,
            enable_query_fusion: true,
            fusion_variant_count: 3,
            enable_hyde: false,
        }
    }
}

/// Generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Language the final answer is written in
    pub answer_language: String,
    /// Reply used when the retrieved context cannot answer the question
    pub no_answer_phrase: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.1-70b-versatile".to_string(),
            temperature: 0.1,
            timeout_secs: 60,
            answer_language: "English".to_string(),
            no_answer_phrase: "No relevant information was found in the provided context."
                .to_string(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            batch_size: 32,
        }
    }
}

/// Rerank configuration; reranking is disabled when no model is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// In-memory vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON Lines file of pre-chunked documents
    pub corpus_file: PathBuf,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            corpus_file: PathBuf::from("~/.ragfuse/corpus.jsonl"),
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// Request server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("~/.ragfuse/ragfuse.sock"),
            max_connections: 32,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_query_fusion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_hyde: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Build configuration without a file: defaults, then environment
    /// overrides and the requested profile, validated like a loaded file
    pub fn from_defaults(profile: Option<&str>) -> Result<Self> {
        Self::from_defaults_with_vars(std::env::vars(), profile)
    }

    fn from_defaults_with_vars(
        vars: impl IntoIterator<Item = (String, String)>,
        profile: Option<&str>,
    ) -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides_from(vars);
        if let Some(profile) = profile {
            config.apply_profile(profile)?;
        }
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| RagError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(enabled) = overrides.enable_query_fusion {
            self.retrieval.enable_query_fusion = enabled;
        }
        if let Some(enabled) = overrides.enable_hyde {
            self.retrieval.enable_hyde = enabled;
        }
        if let Some(final_k) = overrides.final_k {
            self.retrieval.final_k = final_k;
        }
        if let Some(model_id) = overrides.rerank_model_id {
            self.rerank.model_id = Some(model_id);
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RAGFUSE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(std::env::vars());
    }

    fn apply_overrides_from(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("RAGFUSE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "RETRIEVAL__PRIMARY_K" => self.retrieval.primary_k = parse_value(path, value)?,
            "RETRIEVAL__FINAL_K" => self.retrieval.final_k = parse_value(path, value)?,
            "RETRIEVAL__ENABLE_QUERY_FUSION" => {
                self.retrieval.enable_query_fusion = parse_value(path, value)?
            }
            "RETRIEVAL__FUSION_VARIANT_COUNT" => {
                self.retrieval.fusion_variant_count = parse_value(path, value)?
            }
            "RETRIEVAL__ENABLE_HYDE" => self.retrieval.enable_hyde = parse_value(path, value)?,
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            "LLM__ANSWER_LANGUAGE" => self.llm.answer_language = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "RERANK__MODEL_ID" => {
                self.rerank.model_id = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            "STORE__CORPUS_FILE" => self.store.corpus_file = PathBuf::from(value),
            "SERVER__SOCKET_PATH" => self.server.socket_path = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("ragfuse").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rerank: RerankConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| RagError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.final_k = 6;
        config.rerank.model_id = Some("BAAI/bge-reranker-base".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.final_k, 6);
        assert_eq!(
            loaded.rerank.model_id.as_deref(),
            Some("BAAI/bge-reranker-base")
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[_meta]\nschema_version = \"1.0.0\"\n\n[retrieval]\nenable_hyde = true\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.retrieval.enable_hyde);
        assert_eq!(config.retrieval.primary_k, 8);
        assert!(config.rerank.model_id.is_none());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/ragfuse.toml"));
        assert!(matches!(result, Err(RagError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "precise".to_string(),
            ProfileOverrides {
                enable_hyde: Some(true),
                rerank_model_id: Some("BAAI/bge-reranker-base".to_string()),
                final_k: Some(3),
                ..Default::default()
            },
        );

        config.apply_profile("precise").unwrap();
        assert!(config.retrieval.enable_hyde);
        assert_eq!(config.retrieval.final_k, 3);
        assert!(config.rerank.model_id.is_some());

        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_set_value_from_env() {
        let mut config = Config::default();
        config
            .set_value_from_env("RETRIEVAL__ENABLE_QUERY_FUSION", "false")
            .unwrap();
        config.set_value_from_env("RETRIEVAL__PRIMARY_K", "12").unwrap();
        config.set_value_from_env("RERANK__MODEL_ID", "").unwrap();

        assert!(!config.retrieval.enable_query_fusion);
        assert_eq!(config.retrieval.primary_k, 12);
        assert!(config.rerank.model_id.is_none());
        assert!(config
            .set_value_from_env("RETRIEVAL__FINAL_K", "many")
            .is_err());
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_take_env_overrides() {
        let config = Config::from_defaults_with_vars(
            vars(&[
                ("RAGFUSE_RETRIEVAL__ENABLE_HYDE", "true"),
                ("RAGFUSE_LLM__ANSWER_LANGUAGE", "French"),
                ("HOME", "/root"),
            ]),
            None,
        )
        .unwrap();

        assert!(config.retrieval.enable_hyde);
        assert_eq!(config.llm.answer_language, "French");
        assert_eq!(config.retrieval.final_k, 4);
    }

    #[test]
    fn test_defaults_reject_unknown_profile() {
        let result = Config::from_defaults_with_vars(Vec::new(), Some("fast"));
        match result {
            Err(RagError::Config(message)) => assert!(message.contains("Unknown profile")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_defaults_validate_env_overrides() {
        let result =
            Config::from_defaults_with_vars(vars(&[("RAGFUSE_RETRIEVAL__FINAL_K", "0")]), None);
        assert!(matches!(result, Err(RagError::ConfigValidation { .. })));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_tilde(Path::new("~/.ragfuse")),
            home.join(".ragfuse")
        );
        assert_eq!(
            expand_tilde(Path::new("/tmp/ragfuse")),
            PathBuf::from("/tmp/ragfuse")
        );
    }
}
