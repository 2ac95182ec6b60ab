//! Query orchestration pipeline.
//!
//! [`Agent`] is the top-level entry point composing all stages per request:
//! fast-path classification, lazy resource initialization, programme-scope
//! resolution, adaptive retrieval, context assembly, and generation with
//! session history threading. Every failure path converts to a fixed
//! user-facing string — [`Agent::answer`] never returns an error and never
//! panics.

pub mod classifier;
pub mod context;
pub mod scope;

use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::config::{Config, LlmMode};
use crate::prompt::{
    self, RESP_BLOQUEO, RESP_FALLO_INTERNO, RESP_NO_ACADEMICO, RESP_NO_DISPONIBLE, RESP_SALUDO,
    RESP_VACIO,
};
use crate::providers::ollama::OllamaProvider;
use crate::providers::openai::OpenAiProvider;
use crate::providers::LlmProvider;
use crate::retrieval::chroma::ChromaSearch;
use crate::retrieval::embedder::OllamaEmbedder;
use crate::retrieval::{RetrievalEngine, VectorSearch};
use crate::session::{SessionStore, Turn};

use self::classifier::{Classification, Classifier};

/// Session key used when the caller does not manage sessions itself.
pub const DEFAULT_SESSION: &str = "sesion_usuario_local";

/// Lifecycle of the external-service handles.
///
/// `Uninitialized → Ready` happens at most once, on the first request that
/// gets past the fast-path classifier. `Failed` is not terminal: the cause
/// (missing credential, missing index) may be external and fixable without
/// a restart, so the next request re-attempts initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// No request has needed the external services yet.
    Uninitialized,
    /// Clients constructed; pipeline fully operational.
    Ready,
    /// Last initialization attempt failed; will retry on next request.
    Failed,
}

/// Errors constructing the external-service clients.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The configured credential environment variable is unset or empty.
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

/// Handles to the external services, built lazily on first use.
struct Services {
    provider: Arc<dyn LlmProvider>,
    search: Arc<dyn VectorSearch>,
    engine: RetrievalEngine,
}

/// The query orchestrator.
pub struct Agent {
    config: Config,
    classifier: Classifier,
    sessions: Arc<dyn SessionStore>,
    services: OnceCell<Arc<Services>>,
    init_failure: RwLock<Option<String>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent that builds its external clients lazily from config.
    pub fn new(config: Config, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            classifier: Classifier::new(),
            sessions,
            services: OnceCell::new(),
            init_failure: RwLock::new(None),
        }
    }

    /// Create an agent with pre-built service handles.
    ///
    /// Skips lazy initialization entirely; used by tests to substitute the
    /// external services.
    pub fn with_services(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn VectorSearch>,
    ) -> Self {
        let engine = RetrievalEngine::new(
            Arc::clone(&search),
            config.retrieval.k_normal,
            config.retrieval.k_dinero,
        );
        Self {
            config,
            classifier: Classifier::new(),
            sessions,
            services: OnceCell::new_with(Some(Arc::new(Services {
                provider,
                search,
                engine,
            }))),
            init_failure: RwLock::new(None),
        }
    }

    /// Current lifecycle state of the external-service handles.
    pub fn state(&self) -> SystemState {
        if self.services.initialized() {
            return SystemState::Ready;
        }
        let failed = match self.init_failure.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        };
        if failed {
            SystemState::Failed
        } else {
            SystemState::Uninitialized
        }
    }

    /// Explicitly run initialization (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if a client cannot be constructed; a later
    /// call retries.
    pub async fn initialize(&self) -> Result<(), InitError> {
        self.services().await.map(|_| ())
    }

    /// Warm up the external services before the first real query.
    ///
    /// Initializes the clients and issues a single-result probe search.
    /// Failure is logged, never fatal — the first real query is just
    /// slower, or reports the problem itself.
    pub async fn warmup(&self) {
        match self.services().await {
            Ok(services) => {
                if let Err(e) = services.search.search("test", 1, None).await {
                    warn!(error = %e, "warmup probe failed; first query may be slow");
                } else {
                    debug!("warmup probe complete");
                }
            }
            Err(e) => warn!(error = %e, "warmup initialization failed"),
        }
    }

    /// Answer one user input within a session.
    ///
    /// Always returns a user-facing string; every failure is converted to
    /// one of the fixed responses.
    pub async fn answer(&self, user_input: &str, session_id: &str) -> String {
        let input = user_input.trim();
        if input.is_empty() {
            return RESP_VACIO.to_owned();
        }

        match self.classifier.classify(input) {
            Classification::Blocked => {
                info!(session_id, "blocked prompt-injection attempt");
                return RESP_BLOQUEO.to_owned();
            }
            Classification::OffTopic => {
                info!(session_id, "refused non-academic topic");
                return RESP_NO_ACADEMICO.to_owned();
            }
            Classification::Greeting => {
                debug!(session_id, "answered greeting on the fast path");
                return RESP_SALUDO.to_owned();
            }
            Classification::Continue => {}
        }

        let services = match self.services().await {
            Ok(services) => services,
            Err(e) => {
                error!(error = %e, "external services unavailable");
                return RESP_NO_DISPONIBLE.to_owned();
            }
        };

        let scope = scope::resolve_scope(input);
        let money = scope::is_money_query(input);

        let passages = match services.engine.retrieve(input, scope, money).await {
            Ok(passages) => passages,
            Err(e) => {
                error!(error = %e, session_id, "similarity search failed");
                return RESP_FALLO_INTERNO.to_owned();
            }
        };
        info!(
            session_id,
            passages = passages.len(),
            ?scope,
            money,
            "retrieval complete"
        );

        let context = context::assemble(&passages, self.config.retrieval.max_context_chars);
        let history = self.sessions.history(session_id);
        let request = prompt::build_request(
            &history,
            &context,
            input,
            self.config.llm.max_output_tokens,
        );

        let response = match services.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, session_id, "generation failed");
                return RESP_FALLO_INTERNO.to_owned();
            }
        };

        // History is appended only after a successful call, user turn
        // first, so a failed request leaves the session untouched.
        self.sessions.append(session_id, Turn::user(input));
        self.sessions
            .append(session_id, Turn::assistant(response.text.clone()));

        info!(
            session_id,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "answer generated"
        );
        response.text
    }

    /// Get or build the service handles behind the one-shot barrier.
    ///
    /// `OnceCell::get_or_try_init` serializes concurrent first requests so
    /// construction runs at most once, and does not latch failures — a
    /// failed attempt leaves the cell empty for the next request to retry.
    async fn services(&self) -> Result<Arc<Services>, InitError> {
        let result = self
            .services
            .get_or_try_init(|| async { Self::build_services(&self.config).map(Arc::new) })
            .await;

        let failure = match &result {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        match self.init_failure.write() {
            Ok(mut guard) => *guard = failure,
            Err(poisoned) => *poisoned.into_inner() = failure,
        }

        result.cloned()
    }

    /// Construct the LLM provider and the retrieval stack from config.
    fn build_services(config: &Config) -> Result<Services, InitError> {
        let provider: Arc<dyn LlmProvider> = match config.llm.mode {
            LlmMode::Cloud => {
                let api_key = std::env::var(&config.llm.api_key_env)
                    .ok()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        InitError::MissingCredential(config.llm.api_key_env.clone())
                    })?;
                info!(model = %config.llm.cloud_model, "using cloud generation provider");
                Arc::new(OpenAiProvider::new(
                    &config.llm.cloud_base_url,
                    &config.llm.cloud_model,
                    &api_key,
                    config.llm.timeout(),
                ))
            }
            LlmMode::Local => {
                info!(model = %config.llm.ollama_model, "using local generation provider");
                Arc::new(OllamaProvider::new(
                    &config.llm.ollama_base_url,
                    &config.llm.ollama_model,
                    config.llm.timeout(),
                ))
            }
        };

        let embedder = Arc::new(OllamaEmbedder::new(
            &config.retrieval.embedding_base_url,
            &config.retrieval.embedding_model,
            config.retrieval.timeout(),
        ));
        let search: Arc<dyn VectorSearch> = Arc::new(ChromaSearch::new(
            &config.retrieval.chroma_base_url,
            &config.retrieval.collection,
            embedder,
            config.retrieval.timeout(),
        ));
        let engine = RetrievalEngine::new(
            Arc::clone(&search),
            config.retrieval.k_normal,
            config.retrieval.k_dinero,
        );

        info!(
            collection = %config.retrieval.collection,
            "external services initialised"
        );
        Ok(Services {
            provider,
            search,
            engine,
        })
    }
}
