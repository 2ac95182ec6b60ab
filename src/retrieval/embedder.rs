//! Embedding generation for similarity search queries.
//!
//! The [`Embedder`] trait abstracts over embedding providers. The shipped
//! implementation [`OllamaEmbedder`] calls the Ollama `/api/embed` endpoint
//! with a multilingual sentence model — the corpus and the queries are
//! Spanish, so the model must be multilingual.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RetrievalError;

/// Embedding generation interface.
///
/// Implementations must be `Send + Sync` for shared use across async task
/// boundaries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the embedding provider is unreachable
    /// or the request fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Ollama-based embedder using the `/api/embed` endpoint.
pub struct OllamaEmbedder {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OllamaEmbedder {
    /// Create an embedder for the given endpoint and model.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            model: model.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = OllamaEmbedRequest {
            model: self.model.clone(),
            input: text.to_owned(),
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!(
                "embedding endpoint returned {status}: {body_text}"
            )));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Parse(e.to_string()))?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Parse("empty embeddings array".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for Ollama `/api/embed`.
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    /// Model name.
    model: String,
    /// Input text to embed.
    input: String,
}

/// Response body from Ollama `/api/embed`.
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    /// Array of embedding vectors (one per input).
    embeddings: Vec<Vec<f32>>,
}
