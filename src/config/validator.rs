use crate::config::Config;
use crate::error::{RagError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_rerank(config, &mut errors);
        Self::validate_store(config, &mut errors);
        Self::validate_server(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RagError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.primary_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.primary_k",
                "primary_k must be greater than 0",
            ));
        }

        if retrieval.final_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.final_k",
                "final_k must be greater than 0",
            ));
        }

        if retrieval.fusion_variant_count == 0 {
            errors.push(ValidationError::new(
                "retrieval.fusion_variant_count",
                "fusion_variant_count must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let llm = &config.llm;

        // Validate temperature range
        if !(0.0..=2.0).contains(&llm.temperature) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        // Validate provider
        let valid_providers = ["groq", "openai", "ollama", "openai-compatible"];
        if !valid_providers.contains(&llm.provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, llm.provider
                ),
            ));
        }

        // Local providers run without a key
        if llm.provider != "ollama" && llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        if !(llm.base_url.starts_with("http://") || llm.base_url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "llm.base_url",
                format!("Base URL must be http(s), got '{}'", llm.base_url),
            ));
        }

        if llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        if llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if llm.answer_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "llm.answer_language",
                "Answer language cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_rerank(config: &Config, errors: &mut Vec<ValidationError>) {
        if let Some(model_id) = &config.rerank.model_id {
            if model_id.trim().is_empty() {
                errors.push(ValidationError::new(
                    "rerank.model_id",
                    "Model id cannot be blank; remove the key to disable reranking",
                ));
            }
        }
    }

    fn validate_store(config: &Config, errors: &mut Vec<ValidationError>) {
        let store = &config.store;

        if store.corpus_file.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "store.corpus_file",
                "Corpus file path cannot be empty",
            ));
        }

        if store.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "store.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if store.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "store.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if store.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "store.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_server(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.server.socket_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "server.socket_path",
                "Socket path cannot be empty",
            ));
        }

        if config.server.max_connections == 0 {
            errors.push(ValidationError::new(
                "server.max_connections",
                "max_connections must be greater than 0",
            ));
        }
    }
}
