//! Cohere embedding client
//!
//! Converts text into fixed-size vectors via the Cohere embed API. The
//! `input_type` flag distinguishes query embeddings from document
//! embeddings, since v3 models produce asymmetric representations.

use std::time::Duration;

use bookrag_core::{EmbedMode, EmbeddingProvider, ProviderConfig, RagError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const COHERE_EMBED_URL: &str = "https://api.cohere.com/v1/embed";

/// Cohere embedding API client
pub struct CohereEmbedding {
    client: Client,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    texts: Vec<String>,
    model: String,
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Wire value for the embed input mode
fn input_type(mode: EmbedMode) -> &'static str {
    match mode {
        EmbedMode::Query => "search_query",
        EmbedMode::Document => "search_document",
    }
}

/// Output dimensionality of known Cohere v3 models
fn model_dimension(model: &str) -> usize {
    match model {
        "embed-multilingual-v3.0" | "embed-english-v3.0" => 1024,
        "embed-multilingual-light-v3.0" | "embed-english-light-v3.0" => 384,
        _ => 1024,
    }
}

impl CohereEmbedding {
    /// Create a new Cohere embedding client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            dimension: model_dimension(&model),
            model,
        })
    }

    /// Create from config
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .cohere_api_key
            .as_ref()
            .ok_or_else(|| RagError::Config("Cohere API key required".to_string()))?;

        Self::new(
            api_key.clone(),
            config.embedding_model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn send(
        &self,
        request: &EmbedRequest,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(COHERE_EMBED_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
    }

    async fn request(&self, request: &EmbedRequest) -> Result<Vec<Vec<f32>>> {
        // One retry on transient network failure only; auth and quota
        // errors are never retried.
        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::warn!("Retrying embedding call after transient failure: {e}");
                self.send(request)
                    .await
                    .map_err(|e| RagError::Embedding(format!("Embedding request failed: {e}")))?
            }
            Err(e) => {
                return Err(RagError::Embedding(format!("Embedding request failed: {e}")));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RagError::Config(
                "Cohere rejected the API key (check COHERE_API_KEY)".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Cohere embedding error ({status}): {error_text}"
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        Ok(result.embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CohereEmbedding {
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            texts: texts.to_vec(),
            model: self.model.clone(),
            input_type: input_type(mode),
        };

        self.request(&request).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimensions() {
        assert_eq!(model_dimension("embed-multilingual-v3.0"), 1024);
        assert_eq!(model_dimension("embed-english-v3.0"), 1024);
        assert_eq!(model_dimension("embed-multilingual-light-v3.0"), 384);
        assert_eq!(model_dimension("unknown-model"), 1024);
    }

    #[test]
    fn test_input_type_mapping() {
        assert_eq!(input_type(EmbedMode::Query), "search_query");
        assert_eq!(input_type(EmbedMode::Document), "search_document");
    }

    #[test]
    fn test_embed_request_wire_format() {
        let request = EmbedRequest {
            texts: vec!["What is ROS 2?".to_string()],
            model: "embed-multilingual-v3.0".to_string(),
            input_type: input_type(EmbedMode::Query),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input_type"], "search_query");
        assert_eq!(json["model"], "embed-multilingual-v3.0");
        assert_eq!(json["texts"][0], "What is ROS 2?");
    }

    #[test]
    fn test_client_dimension_follows_model() {
        let client = CohereEmbedding::new(
            "test-key",
            "embed-multilingual-light-v3.0",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.dimension(), 384);
    }
}
