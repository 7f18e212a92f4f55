use crate::backend::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ragfuse
#[derive(Error, Debug)]
pub enum RagError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Base similarity search failed; no context can be retrieved
    #[error("Retrieval unavailable: {0}")]
    Retrieval(#[source] BackendError),

    /// Answer generation failed
    #[error("Generation unavailable: {0}")]
    Generation(#[source] BackendError),

    /// Backend construction or invocation outside the request path
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Request server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Request rejected before reaching the pipeline
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Stable error code reported to remote callers
    pub fn code(&self) -> &'static str {
        match self {
            RagError::Retrieval(_) => "retrieval_unavailable",
            RagError::Generation(_) => "generation_unavailable",
            RagError::InvalidRequest(_) => "invalid_request",
            _ => "internal",
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for ragfuse operations
pub type Result<T> = std::result::Result<T, RagError>;
