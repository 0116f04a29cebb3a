//! Configuration management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. Credentials and tuning parameters are
//! carried in an explicit struct passed into adapter constructors, never
//! read from ambient global state, so tests can inject fakes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// External provider credentials and endpoints
    pub providers: ProviderConfig,

    /// Query pipeline tuning
    pub rag: RagConfig,

    /// Ingestion tuning
    pub ingest: IngestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("COHERE_API_KEY") {
            config.providers.cohere_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.providers.gemini_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.providers.qdrant_url = url;
        }
        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            config.providers.qdrant_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.providers.embedding_model = model;
        }
        if let Ok(model) = std::env::var("CHAT_MODEL") {
            config.providers.chat_model = model;
        }

        if let Ok(name) = std::env::var("COLLECTION_NAME") {
            config.rag.collection = name;
        }
        if let Ok(value) = std::env::var("RAG_TOP_K") {
            config.rag.top_k = parse_var("RAG_TOP_K", &value)?;
        }
        if let Ok(value) = std::env::var("RAG_MIN_SCORE") {
            config.rag.min_score = parse_var("RAG_MIN_SCORE", &value)?;
        }

        if let Ok(value) = std::env::var("CHUNK_SIZE") {
            config.ingest.chunk_size = parse_var("CHUNK_SIZE", &value)?;
        }
        if let Ok(value) = std::env::var("CHUNK_OVERLAP") {
            config.ingest.chunk_overlap = parse_var("CHUNK_OVERLAP", &value)?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that parsing alone cannot catch.
    ///
    /// The chunker requires a positive chunk size and an overlap strictly
    /// smaller than it to guarantee forward progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunk_overlap".to_string(),
                value: format!(
                    "{} (must be smaller than chunk_size {})",
                    self.ingest.chunk_overlap, self.ingest.chunk_size
                ),
            });
        }
        Ok(())
    }

    /// Merge with environment variables (env takes precedence for secrets)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.providers.cohere_api_key.is_some() {
            self.providers.cohere_api_key = env_config.providers.cohere_api_key;
        }
        if env_config.providers.gemini_api_key.is_some() {
            self.providers.gemini_api_key = env_config.providers.gemini_api_key;
        }
        if env_config.providers.qdrant_api_key.is_some() {
            self.providers.qdrant_api_key = env_config.providers.qdrant_api_key;
        }
        if env_config.providers.qdrant_url != ProviderConfig::default().qdrant_url {
            self.providers.qdrant_url = env_config.providers.qdrant_url;
        }

        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// External provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Cohere API key for embedding generation
    pub cohere_api_key: Option<String>,

    /// Gemini API key for chat completion
    pub gemini_api_key: Option<String>,

    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant API key (cloud deployments)
    pub qdrant_api_key: Option<String>,

    /// Embedding model name
    pub embedding_model: String,

    /// Chat model name
    pub chat_model: String,

    /// Timeout for embedding and index calls, in seconds
    pub request_timeout_secs: u64,

    /// Timeout for generation calls, in seconds.
    /// Generous because language-model latency is the dominant cost.
    pub generation_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cohere_api_key: None,
            gemini_api_key: None,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            embedding_model: "embed-multilingual-v3.0".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 30,
            generation_timeout_secs: 60,
        }
    }
}

/// Query pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Collection to search
    pub collection: String,

    /// Number of nearest points to retrieve
    pub top_k: usize,

    /// Minimum relevance score for a result to enter the context
    pub min_score: f32,

    /// Maximum assembled context size in characters.
    /// Lowest-ranked chunks are dropped first when this would be exceeded.
    pub max_context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: "book_embeddings".to_string(),
            top_k: 5,
            min_score: 0.3,
            max_context_chars: 8000,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Minimum chunk size (smaller fragments are dropped)
    pub min_chunk_size: usize,

    /// Number of chunks embedded per provider call
    pub embed_batch_size: usize,

    /// Concurrent embedding calls during ingestion
    pub embed_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            embed_batch_size: 32,
            embed_concurrency: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rag.collection, "book_embeddings");
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.providers.chat_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        let result: Result<usize, _> = parse_var("RAG_TOP_K", "not-a-number");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = AppConfig::default();
        config.ingest.chunk_size = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "chunk_size"));
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut config = AppConfig::default();
        config.ingest.chunk_size = 100;
        config.ingest.chunk_overlap = 100;

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "chunk_overlap")
        );
    }

    #[test]
    fn test_from_toml() {
        let toml_text = r#"
            [providers]
            qdrant_url = "http://qdrant.example:6334"
            embedding_model = "embed-english-v3.0"
            chat_model = "gemini-2.5-flash"
            request_timeout_secs = 15
            generation_timeout_secs = 90

            [rag]
            collection = "book_embeddings"
            top_k = 3
            min_score = 0.25
            max_context_chars = 4000

            [ingest]
            chunk_size = 800
            chunk_overlap = 100
            min_chunk_size = 50
            embed_batch_size = 16
            embed_concurrency = 2

            [logging]
            level = "debug"
        "#;

        let config: AppConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.ingest.chunk_size, 800);
        assert_eq!(config.providers.qdrant_url, "http://qdrant.example:6334");
    }
}
