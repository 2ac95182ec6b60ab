//! Similarity search against the external vector index.
//!
//! The [`VectorSearch`] trait is the boundary with the opaque search
//! service; [`ChromaSearch`](chroma::ChromaSearch) is the shipped
//! implementation (embedding via Ollama, index via Chroma). The
//! [`RetrievalEngine`] sits in front of the trait and applies the
//! per-query retrieval policy: adaptive result width and search-string
//! augmentation for money queries, plus the programme scope filter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod chroma;
pub mod embedder;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A retrieved unit of source text with its source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Raw passage text.
    pub text: String,
    /// Source document identifier (e.g. `magister_informatica.md`).
    pub source: String,
}

/// Programme category restricting retrieval to one slice of the corpus.
///
/// Derived per request from keyword presence in the query; maps onto a
/// containment constraint over the document source identifier so that
/// similarly named fields (tuition, requirements) from one programme type
/// never contaminate answers about another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramScope {
    /// Doctoral programmes.
    Doctorate,
    /// Master's programmes.
    Masters,
    /// Diploma programmes.
    Diploma,
}

impl ProgramScope {
    /// Tag the source identifier must contain for a document to qualify.
    pub fn source_tag(self) -> &'static str {
        match self {
            Self::Doctorate => "doctorado",
            Self::Masters => "magister",
            Self::Diploma => "diplomado",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the retrieval stack.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// HTTP transport failure (including per-call timeout).
    #[error("retrieval request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response did not match the expected format.
    #[error("retrieval response parse error: {0}")]
    Parse(String),

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The search service is unavailable or misconfigured.
    #[error("search service unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Opaque similarity-search service.
///
/// Returns up to `k` passages in descending relevance order. A `filter`
/// restricts results to documents whose source identifier contains the
/// scope's tag.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Run one similarity search.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the service is unreachable or responds
    /// with an unexpected payload.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<ProgramScope>,
    ) -> Result<Vec<Passage>, RetrievalError>;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Fixed suffix appended to the search string for money queries.
///
/// Biases the similarity search toward numeric/financial passages without
/// altering the user-facing question.
pub const MONEY_SEARCH_SUFFIX: &str =
    " arancel matrícula costo valor anual semestral pesos matricula";

/// Retrieval policy wrapper over a [`VectorSearch`] service.
///
/// Money queries widen recall (`k_dinero` instead of `k_normal`) because
/// tuition and enrolment figures are scattered across more passages, and
/// disambiguating enrolment fee from annual tuition benefits from broader
/// context.
pub struct RetrievalEngine {
    search: Arc<dyn VectorSearch>,
    k_normal: usize,
    k_dinero: usize,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("k_normal", &self.k_normal)
            .field("k_dinero", &self.k_dinero)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Create an engine over a search service with the configured widths.
    pub fn new(search: Arc<dyn VectorSearch>, k_normal: usize, k_dinero: usize) -> Self {
        Self {
            search,
            k_normal,
            k_dinero,
        }
    }

    /// Retrieve passages for one query under the per-query policy.
    ///
    /// `money` selects the wider result count and augments the search
    /// string; `scope` is forwarded to the service as a source filter.
    ///
    /// # Errors
    ///
    /// Propagates [`RetrievalError`] from the underlying service.
    pub async fn retrieve(
        &self,
        query: &str,
        scope: Option<ProgramScope>,
        money: bool,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let k = if money { self.k_dinero } else { self.k_normal };

        let search_text = if money {
            format!("{query}{MONEY_SEARCH_SUFFIX}")
        } else {
            query.to_owned()
        };

        debug!(k, money, ?scope, "issuing similarity search");
        self.search.search(&search_text, k, scope).await
    }
}
