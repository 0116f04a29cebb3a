//! bookrag-vector - Embedding and vector index adapters
//!
//! Thin boundaries over the two retrieval-side providers:
//! - Cohere for text embeddings (query and document modes)
//! - Qdrant for vector storage and k-nearest-neighbor search
//!
//! An in-memory index with the same boundary is provided for tests and
//! offline development.
//!
//! Both adapters translate provider-specific failures into the error
//! taxonomy defined in `bookrag-core`.

pub mod embedding;
pub mod memory;
pub mod qdrant_store;

pub use embedding::CohereEmbedding;
pub use memory::InMemoryIndex;
pub use qdrant_store::QdrantIndex;
