//! Gemini chat completion client
//!
//! Wraps the Gemini generateContent API behind the completion boundary.
//! HTTP 429 is translated to the dedicated quota error because free-tier
//! quota exhaustion is the dominant operational failure mode.

use std::time::Duration;

use bookrag_core::{CompletionProvider, ProviderConfig, RagError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client
#[derive(Debug)]
pub struct GeminiCompletion {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiCompletion {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Create from config
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .as_ref()
            .ok_or_else(|| RagError::Config("Gemini API key required".to_string()))?;

        Self::new(
            api_key.clone(),
            config.chat_model.clone(),
            Duration::from_secs(config.generation_timeout_secs),
        )
    }
}

/// Translate a non-success Gemini status into the error taxonomy
fn translate_status(status: StatusCode, body: &str) -> RagError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => RagError::QuotaExceeded(format!(
            "Gemini rate/quota limit hit (429): {body}"
        )),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RagError::Config(
            "Gemini rejected the API key (check GEMINI_API_KEY)".to_string(),
        ),
        _ => RagError::Generation(format!("Gemini error ({status}): {body}")),
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiCompletion {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!("{GEMINI_BASE_URL}/models/{}:generateContent", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("Generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translate_status(status, &body));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("Failed to parse Gemini response: {e}")))?;

        let text: String = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RagError::Generation(
                "Gemini returned no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_maps_to_quota_exceeded() {
        let err = translate_status(StatusCode::TOO_MANY_REQUESTS, "quota exhausted");
        assert!(matches!(err, RagError::QuotaExceeded(_)));
    }

    #[test]
    fn test_auth_failures_map_to_config() {
        assert!(matches!(
            translate_status(StatusCode::UNAUTHORIZED, ""),
            RagError::Config(_)
        ));
        assert!(matches!(
            translate_status(StatusCode::FORBIDDEN, ""),
            RagError::Config(_)
        ));
    }

    #[test]
    fn test_other_failures_map_to_generation() {
        assert!(matches!(
            translate_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            RagError::Generation(_)
        ));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "ROS 2 is "}, {"text": "a middleware."}]}}
            ]
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "ROS 2 is a middleware.");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = ProviderConfig::default();
        let err = GeminiCompletion::from_config(&config).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}
