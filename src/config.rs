//! Configuration loading and validation.
//!
//! One TOML file, human-owned. Secrets are never stored in the file: cloud
//! credentials are referenced by environment-variable *name* and resolved at
//! initialization time. Every field has a default carrying the tuned runtime
//! constants, so the binary also runs with no config file at all.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// LLM generation service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector-search and embedding service settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Which LLM backend serves generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// OpenAI-compatible chat completions endpoint.
    Cloud,
    /// Local Ollama `/api/chat` endpoint.
    Local,
}

/// LLM generation service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Backend selection (the original's master switch).
    #[serde(default = "default_llm_mode")]
    pub mode: LlmMode,

    /// Base URL of the OpenAI-compatible endpoint (cloud mode).
    #[serde(default = "default_cloud_base_url")]
    pub cloud_base_url: String,

    /// Model name for cloud mode.
    #[serde(default = "default_cloud_model")]
    pub cloud_model: String,

    /// Environment variable holding the cloud API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the Ollama endpoint (local mode).
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Model name for local mode.
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Upper bound on generated tokens per answer.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Per-call timeout in seconds for the generation service.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: default_llm_mode(),
            cloud_base_url: default_cloud_base_url(),
            cloud_model: default_cloud_model(),
            api_key_env: default_api_key_env(),
            ollama_base_url: default_ollama_base_url(),
            ollama_model: default_ollama_model(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector-search and embedding service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the Chroma server.
    #[serde(default = "default_chroma_base_url")]
    pub chroma_base_url: String,

    /// Chroma collection holding the programme knowledge base.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Base URL of the Ollama embedding endpoint.
    #[serde(default = "default_ollama_base_url")]
    pub embedding_base_url: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Passages requested for an ordinary query.
    #[serde(default = "default_k_normal")]
    pub k_normal: usize,

    /// Passages requested for a money query. Tuition and enrolment figures
    /// are scattered across more passages, so recall is widened.
    #[serde(default = "default_k_dinero")]
    pub k_dinero: usize,

    /// Hard character budget for the assembled context.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Per-call timeout in seconds for the search and embedding services.
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chroma_base_url: default_chroma_base_url(),
            collection: default_collection(),
            embedding_base_url: default_ollama_base_url(),
            embedding_model: default_embedding_model(),
            k_normal: default_k_normal(),
            k_dinero: default_k_dinero(),
            max_context_chars: default_max_context_chars(),
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

impl RetrievalConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Default value functions for serde

fn default_llm_mode() -> LlmMode {
    LlmMode::Cloud
}
fn default_cloud_base_url() -> String {
    "https://models.inference.ai.azure.com".to_owned()
}
fn default_cloud_model() -> String {
    "gpt-4o".to_owned()
}
fn default_api_key_env() -> String {
    // The knowledge base was built against GitHub Models, which authenticates
    // with a GitHub token rather than an OpenAI key.
    "GITHUB_TOKEN".to_owned()
}
fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_owned()
}
fn default_ollama_model() -> String {
    "llama3.1".to_owned()
}
fn default_max_output_tokens() -> u32 {
    300
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_chroma_base_url() -> String {
    "http://127.0.0.1:8000".to_owned()
}
fn default_collection() -> String {
    "postgrados".to_owned()
}
fn default_embedding_model() -> String {
    "paraphrase-multilingual".to_owned()
}
fn default_k_normal() -> usize {
    4
}
fn default_k_dinero() -> usize {
    10
}
fn default_max_context_chars() -> usize {
    12_000
}
fn default_retrieval_timeout_secs() -> u64 {
    30
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.mauricia/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".mauricia"))
}
