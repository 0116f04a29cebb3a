//! bookrag-agent - Retrieval-augmented query agent
//!
//! Orchestrates the query pipeline: embed the question, search the vector
//! index for semantically relevant passages, assemble a bounded context
//! prompt, and generate a grounded answer with cited sources.
//!
//! The three external providers sit behind traits so the whole pipeline
//! runs against deterministic fakes in tests.

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiCompletion;
pub use prompt::{assemble_prompt, PromptBuilder};

use std::sync::Arc;

use bookrag_core::{
    AgentAnswer, CompletionProvider, EmbedMode, EmbeddingProvider, RagConfig, RagError, Result,
    SearchResult, VectorIndexProvider,
};

/// Retrieval-augmented agent over a book collection
pub struct BookRagAgent {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    completion: Arc<dyn CompletionProvider>,
    config: RagConfig,
}

impl BookRagAgent {
    /// Create a new agent
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        completion: Arc<dyn CompletionProvider>,
        config: RagConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            config,
        }
    }

    /// Answer a question against the indexed book.
    ///
    /// Pure query: three sequential provider calls (embed, search,
    /// generate) and no mutation of the index. Results below the
    /// relevance threshold are dropped; if none remain the model answers
    /// without book context and `context_used` is false.
    pub async fn run(&self, query: &str) -> Result<AgentAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::Validation("Query must not be empty".to_string()));
        }

        tracing::info!(collection = %self.config.collection, "RAG query started");

        let vectors = self
            .embedder
            .embed(&[query.to_string()], EmbedMode::Query)
            .await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("No embedding returned for query".to_string()))?;

        let results = self
            .index
            .search(&self.config.collection, &query_vector, self.config.top_k)
            .await?;
        tracing::debug!(results = results.len(), "Vector search completed");

        let sources = self.filter_and_rank(results);
        let context_used = !sources.is_empty();
        tracing::debug!(
            sources = sources.len(),
            context_used,
            min_score = self.config.min_score,
            "Relevance filtering completed"
        );

        let prompt = assemble_prompt(query, &sources, self.config.max_context_chars);
        tracing::debug!(prompt_chars = prompt.len(), "Calling completion provider");

        let answer = self.completion.generate(&prompt).await?;
        tracing::info!(answer_chars = answer.len(), "RAG query completed");

        Ok(AgentAnswer {
            answer,
            sources,
            context_used,
        })
    }

    /// Drop results below the relevance threshold and re-rank the rest
    fn filter_and_rank(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut sources: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.relevance_score >= self.config.min_score)
            .collect();

        sources.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, source) in sources.iter_mut().enumerate() {
            source.rank = rank;
        }
        sources
    }
}
