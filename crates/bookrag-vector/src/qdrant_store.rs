//! Qdrant implementation of the vector index boundary
//!
//! Handles collection management, idempotent upserts, and similarity
//! search over chunk payloads.

use std::collections::HashMap;
use std::time::Duration;

use bookrag_core::{
    ChunkPayload, CollectionInfo, IndexedPoint, ProviderConfig, RagError, Result, SearchResult,
    VectorIndexProvider,
};
use qdrant_client::qdrant::{
    vectors_config, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};

/// Qdrant vector index adapter
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Connect to Qdrant using the configured URL and optional API key
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .api_key(config.qdrant_api_key.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RagError::Retrieval(format!("Qdrant connection failed: {e}")))?;

        Ok(Self { client })
    }
}

/// Convert a chunk payload into a Qdrant payload map
fn to_qdrant_payload(payload: &ChunkPayload) -> Result<Payload> {
    let value = serde_json::to_value(payload)
        .map_err(|e| RagError::Retrieval(format!("Failed to serialize payload: {e}")))?;

    Payload::try_from(value)
        .map_err(|e| RagError::Retrieval(format!("Failed to build Qdrant payload: {e}")))
}

/// Read a chunk payload back out of a Qdrant point
fn result_from_payload(payload: &HashMap<String, Value>, score: f32, rank: usize) -> SearchResult {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .unwrap_or_default()
    };

    SearchResult {
        content: field("content"),
        section: field("section"),
        source_path: field("source_path"),
        relevance_score: score,
        rank,
    }
}

#[async_trait::async_trait]
impl VectorIndexProvider for QdrantIndex {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to list collections: {e}")))?;

        let exists = collections.collections.iter().any(|c| c.name == collection);

        if !exists {
            tracing::info!(collection, dimension, "Creating collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(collection).vectors_config(
                        VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| RagError::Retrieval(format!("Failed to create collection: {e}")))?;
        }

        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<()> {
        let qdrant_points = points
            .iter()
            .map(|point| {
                Ok(PointStruct::new(
                    point.id.to_string(),
                    point.vector.clone(),
                    to_qdrant_payload(&point.payload)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, qdrant_points))
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to upsert points: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query_vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Retrieval(format!("Vector search failed: {e}")))?;

        Ok(response
            .result
            .into_iter()
            .enumerate()
            .map(|(rank, point)| result_from_payload(&point.payload, point.score, rank))
            .collect())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        let response = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to get collection info: {e}")))?;

        let info = response
            .result
            .ok_or_else(|| RagError::NotFound(format!("Collection {collection} not found")))?;

        let vector_size = info
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                vectors_config::Config::Params(params) => Some(params.size),
                vectors_config::Config::ParamsMap(_) => None,
            })
            .unwrap_or_default();

        Ok(CollectionInfo {
            points_count: info.points_count.unwrap_or_default(),
            vector_size,
        })
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to delete collection: {e}")))?;

        Ok(())
    }
}
