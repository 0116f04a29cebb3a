//! bookrag-core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the bookrag
//! pipeline:
//! - Document chunks and indexed points
//! - Search results and agent answers
//! - Common error types
//! - Provider traits for embedding, vector index, and chat completion
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, IngestConfig, LoggingConfig, ProviderConfig, RagConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for bookrag operations
///
/// Adapters translate provider-specific failures into these kinds so the
/// agent and ingestor can propagate them without losing which stage failed.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Retrieval(String),

    /// The generation provider hit its rate/quota limit (HTTP 429).
    ///
    /// Kept distinct from [`RagError::Generation`] because quota exhaustion
    /// is the expected, recoverable-by-waiting failure mode and callers
    /// should present a retry-later message rather than a generic error.
    #[error("Generation quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Generation provider error: {0}")]
    Generation(String),

    #[error("Ingestion failed after {chunks_ingested} chunks: {source}")]
    PartialIngest {
        chunks_ingested: usize,
        #[source]
        source: Box<RagError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for RagError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

// ============================================================================
// Document Models
// ============================================================================

/// Payload stored alongside each vector in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Text content of the chunk
    pub content: String,

    /// Human-readable section label (nearest preceding heading)
    pub section: String,

    /// Path of the source document
    pub source_path: String,
}

/// A contiguous span of source text, immutable once stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Content-derived identifier, stable across re-ingestion
    pub id: Uuid,

    /// Text content
    pub content: String,

    /// Section label derived from document structure
    pub section: String,

    /// Path of the source document
    pub source_path: String,
}

impl DocumentChunk {
    /// Create a chunk with an id derived from its source path and position.
    ///
    /// Re-ingesting unchanged content produces the same id, so repeated
    /// ingestion upserts in place instead of duplicating points.
    pub fn new(
        source_path: impl Into<String>,
        index: u32,
        content: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        let source_path = source_path.into();
        Self {
            id: chunk_id(&source_path, index),
            content: content.into(),
            section: section.into(),
            source_path,
        }
    }

    /// Payload stored with this chunk's vector
    pub fn payload(&self) -> ChunkPayload {
        ChunkPayload {
            content: self.content.clone(),
            section: self.section.clone(),
            source_path: self.source_path.clone(),
        }
    }
}

/// Derive a stable chunk id from source path and chunk position
pub fn chunk_id(source_path: &str, index: u32) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{source_path}:{index}").as_bytes(),
    )
}

/// The persisted unit in the vector index
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl IndexedPoint {
    /// Pair a chunk with its embedding vector
    pub fn new(chunk: &DocumentChunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            vector,
            payload: chunk.payload(),
        }
    }
}

// ============================================================================
// Search and Answer Types
// ============================================================================

/// Input mode for embedding generation.
///
/// Some embedding models produce asymmetric representations for queries
/// and documents, so the mode used at query time must differ from the one
/// used at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMode {
    /// Embedding a user query ("search_query")
    Query,
    /// Embedding a document chunk ("search_document")
    Document,
}

/// A retrieved chunk with its similarity score and rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk content
    pub content: String,

    /// Section label
    pub section: String,

    /// Path of the source document
    pub source_path: String,

    /// Similarity score, higher is more relevant
    pub relevance_score: f32,

    /// Position in the result list, 0 is most relevant
    pub rank: usize,
}

/// Answer produced by the agent for a single query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnswer {
    /// Generated answer text
    pub answer: String,

    /// Retrieved sources, most relevant first
    pub sources: Vec<SearchResult>,

    /// Whether any retrieved chunk met the relevance threshold
    pub context_used: bool,
}

/// Summary of a completed ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Number of documents processed
    pub total_files: usize,

    /// Number of chunks embedded and upserted
    pub total_chunks: usize,

    /// Identifier for this ingestion run
    pub job_id: Uuid,
}

/// Collection statistics from the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Number of points stored
    pub points_count: u64,

    /// Vector dimensionality of the collection
    pub vector_size: u64,
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Trait for embedding providers
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one vector per input text, in input order
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>>;

    /// Output dimensionality of the model in use
    fn dimension(&self) -> usize;
}

/// Trait for vector index providers
#[async_trait::async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Create the collection if it does not exist
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Upsert points, idempotent by point id
    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<()>;

    /// K-nearest-neighbor search, results ordered by descending score
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Point count and vector size for a collection
    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo>;

    /// Drop a collection and all of its points
    async fn delete_collection(&self, collection: &str) -> Result<()>;
}

/// Trait for chat completion providers
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate text for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let first = chunk_id("docs/intro.md", 0);
        let second = chunk_id("docs/intro.md", 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_id_varies_by_position_and_path() {
        let base = chunk_id("docs/intro.md", 0);
        assert_ne!(base, chunk_id("docs/intro.md", 1));
        assert_ne!(base, chunk_id("docs/other.md", 0));
    }

    #[test]
    fn test_document_chunk_payload() {
        let chunk = DocumentChunk::new("docs/ros2.md", 3, "ROS 2 is middleware.", "Introduction");
        let payload = chunk.payload();

        assert_eq!(payload.content, "ROS 2 is middleware.");
        assert_eq!(payload.section, "Introduction");
        assert_eq!(payload.source_path, "docs/ros2.md");
        assert_eq!(chunk.id, chunk_id("docs/ros2.md", 3));
    }

    #[test]
    fn test_indexed_point_keeps_chunk_id() {
        let chunk = DocumentChunk::new("docs/a.md", 0, "content", "A");
        let point = IndexedPoint::new(&chunk, vec![0.1, 0.2]);

        assert_eq!(point.id, chunk.id);
        assert_eq!(point.payload.content, "content");
    }

    #[test]
    fn test_quota_error_is_distinct() {
        let err = RagError::QuotaExceeded("429 from provider".to_string());
        assert!(matches!(err, RagError::QuotaExceeded(_)));
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_partial_ingest_carries_count_and_kind() {
        let err = RagError::PartialIngest {
            chunks_ingested: 42,
            source: Box::new(RagError::Embedding("provider down".to_string())),
        };

        let message = err.to_string();
        assert!(message.contains("42"));

        let RagError::PartialIngest { source, .. } = err else {
            panic!("expected PartialIngest");
        };
        assert!(matches!(*source, RagError::Embedding(_)));
    }
}
