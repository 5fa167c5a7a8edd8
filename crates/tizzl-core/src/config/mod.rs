//! Configuration management

use crate::error::{Result, TizzlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Retrieval pipeline policy knobs
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Which text generation backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (OpenAI, vLLM, ...)
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Deterministic canned responses, no network
    Mock,
}

impl ProviderKind {
    fn from_env() -> Self {
        match std::env::var("TIZZL_PROVIDER").ok().as_deref() {
            Some("openai") => Self::OpenAi,
            Some("anthropic") => Self::Anthropic,
            Some("mock") => Self::Mock,
            _ => {
                if std::env::var("OPENAI_API_KEY").is_ok() {
                    Self::OpenAi
                } else if std::env::var("ANTHROPIC_API_KEY").is_ok() {
                    Self::Anthropic
                } else {
                    Self::Mock
                }
            }
        }
    }
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Text generation backend
    #[serde(default = "ProviderKind::from_env")]
    pub provider: ProviderKind,

    /// Base URL of the OpenAI-compatible service for chat/completions
    #[serde(default = "default_url")]
    pub url: String,

    /// Base URL of the Anthropic messages API
    #[serde(default = "default_anthropic_url")]
    pub anthropic_url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// API key for the OpenAI-compatible service
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// API key for Anthropic
    #[serde(default, skip_serializing)]
    pub anthropic_api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token ceiling
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Whether a remote embedding service is configured
    pub fn has_embedding_service(&self) -> bool {
        self.api_key.is_some() || self.embedding_url.is_some()
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::from_env(),
            url: default_url(),
            anthropic_url: default_anthropic_url(),
            model: default_chat_model(),
            embedding_url: std::env::var("TIZZL_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_url() -> String {
    std::env::var("TIZZL_LLM_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

fn default_anthropic_url() -> String {
    std::env::var("TIZZL_ANTHROPIC_URL")
        .unwrap_or_else(|_| "https://api.anthropic.com".to_string())
}

fn default_chat_model() -> String {
    std::env::var("TIZZL_LLM_MODEL").unwrap_or_else(|_| "gpt-4-turbo-preview".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("TIZZL_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn default_embedding_dimensions() -> usize {
    std::env::var("TIZZL_EMBEDDING_DIMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1536)
}

fn default_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

/// Retrieval pipeline configuration
///
/// `recall_top_k` sizes the broad vector search; the request's
/// `max_results` (capped by `max_results_ceiling`) sizes the final list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours requested from the index
    #[serde(default = "default_recall_top_k")]
    pub recall_top_k: usize,

    /// Upper bound applied to every request's max_results
    #[serde(default = "default_max_results_ceiling")]
    pub max_results_ceiling: usize,

    /// Rerank only when the candidate count exceeds this.
    /// Defaults to the final result size of the request.
    #[serde(default)]
    pub rerank_threshold: Option<usize>,

    /// Candidates beyond this many keep retrieval order after reranking
    #[serde(default = "default_max_rerank_candidates")]
    pub max_rerank_candidates: usize,

    /// Minimum cosine similarity a candidate needs to survive retrieval
    #[serde(default)]
    pub similarity_threshold: Option<f32>,

    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    #[serde(default = "default_generate_timeout_ms")]
    pub generate_timeout_ms: u64,

    /// Extra attempts after a transient vector index failure
    #[serde(default = "default_index_retries")]
    pub index_retries: u32,

    /// Extra attempts per generation stage (at most one is honoured)
    #[serde(default)]
    pub generation_retries: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            recall_top_k: default_recall_top_k(),
            max_results_ceiling: default_max_results_ceiling(),
            rerank_threshold: None,
            max_rerank_candidates: default_max_rerank_candidates(),
            similarity_threshold: None,
            embed_timeout_ms: default_embed_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            generate_timeout_ms: default_generate_timeout_ms(),
            index_retries: default_index_retries(),
            generation_retries: 0,
        }
    }
}

fn default_recall_top_k() -> usize {
    50
}

fn default_max_results_ceiling() -> usize {
    100
}

fn default_max_rerank_candidates() -> usize {
    50
}

fn default_embed_timeout_ms() -> u64 {
    5_000
}

fn default_search_timeout_ms() -> u64 {
    2_000
}

fn default_generate_timeout_ms() -> u64 {
    15_000
}

fn default_index_retries() -> u32 {
    1
}

impl RetrievalConfig {
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }

    /// Generation attempts per stage, never more than one retry
    pub fn generation_attempts(&self) -> u32 {
        1 + self.generation_retries.min(1)
    }

    /// Final result size for a request asking for `max_results`
    pub fn final_size(&self, max_results: usize) -> usize {
        max_results.min(self.max_results_ceiling)
    }

    /// Candidate count above which the reranker runs
    pub fn rerank_threshold_for(&self, final_size: usize) -> usize {
        self.rerank_threshold.unwrap_or(final_size)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recall_top_k == 0 {
            return Err(TizzlError::Config("recall_top_k must be positive".into()));
        }
        if self.max_results_ceiling == 0 {
            return Err(TizzlError::Config(
                "max_results_ceiling must be positive".into(),
            ));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(TizzlError::Config(format!(
                    "similarity_threshold {} outside [-1, 1]",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.retrieval.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
