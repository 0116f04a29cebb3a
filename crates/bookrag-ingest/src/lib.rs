//! bookrag-ingest - Document ingestion pipeline
//!
//! Walks a directory of book documents, chunks them, embeds each chunk in
//! document mode, and upserts the resulting points into a vector index
//! collection. Ingestion is additive and idempotent by chunk id: chunk ids
//! are derived from source path and position, so re-ingesting unchanged
//! content overwrites points in place.

pub mod chunk;

pub use chunk::chunk_markdown;

use std::path::Path;
use std::sync::Arc;

use bookrag_core::{
    DocumentChunk, EmbedMode, EmbeddingProvider, IndexedPoint, IngestConfig, IngestReport,
    RagError, Result, VectorIndexProvider,
};
use futures::StreamExt;
use uuid::Uuid;
use walkdir::WalkDir;

/// File extensions treated as book documents
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "txt"];

/// Document ingestor
///
/// Holds the embedding provider and vector index behind their traits so
/// tests can run the full pipeline against deterministic fakes.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    config: IngestConfig,
}

impl Ingestor {
    /// Create a new ingestor
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        config: IngestConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Ingest all documents under `source_dir` into `collection`.
    ///
    /// Embedding runs with bounded concurrency across batches; batch order
    /// is preserved so every vector is attributed to the chunk that
    /// produced it. On mid-run failure the error reports how many chunks
    /// were ingested before the failure.
    pub async fn ingest(&self, source_dir: &Path, collection: &str) -> Result<IngestReport> {
        let files = discover_documents(source_dir)?;
        let total_files = files.len();
        tracing::info!(total_files, collection, "Starting ingestion");

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for file in &files {
            let content = std::fs::read_to_string(file).map_err(|e| {
                RagError::Validation(format!("Unreadable document {}: {e}", file.display()))
            })?;

            let source_path = file.display().to_string();
            let default_section = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");

            let file_chunks = chunk_markdown(&source_path, &content, default_section, &self.config);
            tracing::debug!(
                file = %file.display(),
                chunks = file_chunks.len(),
                "Chunked document"
            );
            chunks.extend(file_chunks);
        }

        self.index
            .ensure_collection(collection, self.embedder.dimension())
            .await?;

        let total_chunks = self.embed_and_upsert(collection, chunks).await?;
        let report = IngestReport {
            total_files,
            total_chunks,
            job_id: Uuid::new_v4(),
        };

        tracing::info!(
            total_files = report.total_files,
            total_chunks = report.total_chunks,
            job_id = %report.job_id,
            "Ingestion complete"
        );
        Ok(report)
    }

    /// Embed chunks in batches and upsert them, tracking progress for
    /// partial-failure reporting
    async fn embed_and_upsert(
        &self,
        collection: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize> {
        let batch_size = self.config.embed_batch_size.max(1);
        let batches: Vec<Vec<DocumentChunk>> =
            chunks.chunks(batch_size).map(<[_]>::to_vec).collect();

        let mut embedded = futures::stream::iter(batches.into_iter().map(|batch| {
            let embedder = Arc::clone(&self.embedder);
            async move {
                let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
                let vectors = embedder.embed(&texts, EmbedMode::Document).await?;

                if vectors.len() != batch.len() {
                    return Err(RagError::Embedding(format!(
                        "Provider returned {} vectors for {} inputs",
                        vectors.len(),
                        batch.len()
                    )));
                }

                let points: Vec<IndexedPoint> = batch
                    .iter()
                    .zip(vectors)
                    .map(|(chunk, vector)| IndexedPoint::new(chunk, vector))
                    .collect();
                Ok(points)
            }
        }))
        .buffered(self.config.embed_concurrency.max(1));

        let mut ingested = 0usize;
        while let Some(result) = embedded.next().await {
            let points = result.map_err(|e| partial(ingested, e))?;
            let count = points.len();

            self.index
                .upsert(collection, points)
                .await
                .map_err(|e| partial(ingested, e))?;
            ingested += count;
        }

        Ok(ingested)
    }
}

fn partial(chunks_ingested: usize, source: RagError) -> RagError {
    if chunks_ingested == 0 {
        return source;
    }
    RagError::PartialIngest {
        chunks_ingested,
        source: Box::new(source),
    }
}

/// Recursively discover eligible documents under a directory, sorted for
/// deterministic chunk ids across runs
pub fn discover_documents(source_dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    if !source_dir.is_dir() {
        return Err(RagError::NotFound(format!(
            "Source directory does not exist: {}",
            source_dir.display()
        )));
    }

    let mut files: Vec<std::path::PathBuf> = WalkDir::new(source_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        return Err(RagError::NotFound(format!(
            "No eligible documents under {}",
            source_dir.display()
        )));
    }

    files.sort();
    Ok(files)
}
