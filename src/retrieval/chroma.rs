//! Chroma vector-index client.
//!
//! Implements [`VectorSearch`] against the Chroma HTTP API: the query text
//! is embedded first, then a nearest-neighbour query is issued against the
//! configured collection. A programme scope becomes a `$contains`
//! predicate on the `source` metadata field, so the index itself excludes
//! documents from other programme categories.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::embedder::Embedder;
use super::{Passage, ProgramScope, RetrievalError, VectorSearch};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chroma collection query request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChromaQueryRequest {
    /// One embedding per query; this client always sends exactly one.
    pub query_embeddings: Vec<Vec<f32>>,
    /// Number of neighbours to return.
    pub n_results: usize,
    /// Metadata predicate, present only when a scope filter applies.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_filter: Option<Value>,
    /// Response sections to include.
    pub include: Vec<String>,
}

/// Chroma collection query response body.
///
/// Results come nested one list per query embedding; this client sends one
/// embedding, so only the first inner list is meaningful.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChromaQueryResponse {
    /// Document texts, ranked most relevant first.
    pub documents: Option<Vec<Vec<String>>>,
    /// Per-document metadata objects.
    pub metadatas: Option<Vec<Vec<Option<Value>>>>,
}

/// Build the query body for one search.
#[doc(hidden)]
pub fn build_query_body(
    embedding: Vec<f32>,
    k: usize,
    filter: Option<ProgramScope>,
) -> ChromaQueryRequest {
    let where_filter = filter.map(|scope| {
        serde_json::json!({ "source": { "$contains": scope.source_tag() } })
    });

    ChromaQueryRequest {
        query_embeddings: vec![embedding],
        n_results: k,
        where_filter,
        include: vec!["documents".to_owned(), "metadatas".to_owned()],
    }
}

/// Zip a query response into ranked passages.
///
/// Documents without a `source` metadata field keep an empty identifier
/// rather than being dropped; rank order is preserved.
#[doc(hidden)]
pub fn parse_query_response(resp: ChromaQueryResponse) -> Vec<Passage> {
    let documents = resp
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let mut metadatas = resp
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    documents
        .into_iter()
        .map(|text| {
            let source = metadatas
                .next()
                .flatten()
                .as_ref()
                .and_then(|m| m.get("source"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            Passage { text, source }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Similarity search backed by a Chroma collection.
pub struct ChromaSearch {
    base_url: String,
    collection: String,
    embedder: Arc<dyn Embedder>,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChromaSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaSearch")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl ChromaSearch {
    /// Create a client for the given server and collection.
    pub fn new(
        base_url: &str,
        collection: &str,
        embedder: Arc<dyn Embedder>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            collection: collection.to_owned(),
            embedder,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VectorSearch for ChromaSearch {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<ProgramScope>,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let embedding = self.embedder.embed(query).await?;
        let body = build_query_body(embedding, k, filter);

        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, self.collection
        );
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!(
                "chroma returned {status}: {body_text}"
            )));
        }

        let parsed: ChromaQueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Parse(e.to_string()))?;

        Ok(parse_query_response(parsed))
    }
}
