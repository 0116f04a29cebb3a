//! In-memory vector index using cosine similarity
//!
//! A zero-infrastructure implementation of the vector index boundary,
//! backed by a `HashMap` behind a `tokio::sync::RwLock`. Used for tests
//! and offline development where a Qdrant instance is not available.

use std::collections::HashMap;

use bookrag_core::{
    CollectionInfo, IndexedPoint, RagError, Result, SearchResult, VectorIndexProvider,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    points: HashMap<Uuid, IndexedPoint>,
}

impl InMemoryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors, 0.0 if either has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn missing(collection: &str) -> RagError {
    RagError::Retrieval(format!("Collection {collection} does not exist"))
}

#[async_trait::async_trait]
impl VectorIndexProvider for InMemoryIndex {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension,
                points: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        for point in points {
            entry.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;

        let mut scored: Vec<SearchResult> = entry
            .points
            .values()
            .map(|point| SearchResult {
                content: point.payload.content.clone(),
                section: point.payload.section.clone(),
                source_path: point.payload.source_path.clone(),
                relevance_score: cosine_similarity(&point.vector, query_vector),
                rank: 0,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        for (rank, result) in scored.iter_mut().enumerate() {
            result.rank = rank;
        }
        Ok(scored)
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| RagError::NotFound(format!("Collection {collection} not found")))?;

        Ok(CollectionInfo {
            points_count: entry.points.len() as u64,
            vector_size: entry.dimension as u64,
        })
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrag_core::{ChunkPayload, DocumentChunk};

    fn point(content: &str, section: &str, vector: Vec<f32>) -> IndexedPoint {
        let chunk = DocumentChunk::new("docs/test.md", 0, content, section);
        IndexedPoint {
            id: chunk.id,
            vector,
            payload: ChunkPayload {
                content: content.to_string(),
                section: section.to_string(),
                source_path: "docs/test.md".to_string(),
            },
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_descending_score() {
        let index = InMemoryIndex::new();
        index.ensure_collection("books", 2).await.unwrap();

        let mut near = point("near", "A", vec![1.0, 0.1]);
        near.id = Uuid::new_v4();
        let mut far = point("far", "B", vec![0.0, 1.0]);
        far.id = Uuid::new_v4();

        index.upsert("books", vec![far, near]).await.unwrap();

        let results = index.search("books", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "near");
        assert!(results[0].relevance_score > results[1].relevance_score);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[1].rank, 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_id() {
        let index = InMemoryIndex::new();
        index.ensure_collection("books", 2).await.unwrap();

        let first = point("original", "A", vec![1.0, 0.0]);
        let second = point("replaced", "A", vec![1.0, 0.0]);
        // Same source path and position, so the same id
        let replacement = IndexedPoint {
            id: first.id,
            ..second
        };

        index.upsert("books", vec![first]).await.unwrap();
        index.upsert("books", vec![replacement]).await.unwrap();

        let info = index.collection_info("books").await.unwrap();
        assert_eq!(info.points_count, 1);

        let results = index.search("books", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].content, "replaced");
    }

    #[tokio::test]
    async fn test_search_missing_collection_fails() {
        let index = InMemoryIndex::new();
        let err = index.search("absent", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let index = InMemoryIndex::new();
        index.ensure_collection("books", 2).await.unwrap();
        index.delete_collection("books").await.unwrap();

        let err = index.collection_info("books").await.unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }
}
