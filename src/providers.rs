//! External collaborator interfaces consumed by the evaluation core.
//!
//! The core never talks to a network or a model directly; everything arrives
//! through these traits. All implementations must be `Send + Sync` so the
//! orchestrators can fan out across servers and batches.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConnectivityError, LlmError};
use crate::run::{ActualToolCall, ConfidenceLevel};
use crate::tool_def::ToolDefinition;

/// Transport protocol for reaching an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Server-sent events.
    Sse,
    /// Streamable HTTP.
    StreamableHttp,
}

/// Model settings passed opaquely to the LLM collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Provider identifier (e.g. "openai").
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ModelSettings {
    /// Creates settings for a provider/model pair with defaults.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Structured response from a tool-selection LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSelection {
    /// Tool calls the LLM produced, in trace order. Empty when the LLM
    /// declined to call any tool.
    pub tool_calls: Vec<ActualToolCall>,
    /// Confidence the LLM reported for the selection.
    pub confidence: Option<ConfidenceLevel>,
    /// Raw provider response, kept verbatim for debugging.
    pub raw_response: String,
}

/// Source of fresh tool definitions, fetched per run with no cross-run
/// caching.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Fetches the tool definitions a server currently publishes.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectivityError`] when the server is unreachable or tool
    /// listing fails. A failure fails the whole run.
    async fn fetch_tools(
        &self,
        server_url: &str,
        transport: Transport,
    ) -> Result<Vec<ToolDefinition>, ConnectivityError>;
}

/// LLM collaborator that selects tools for a query.
#[async_trait]
pub trait LlmToolCaller: Send + Sync {
    /// Asks the model to select tools for the query given the candidate set.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on provider failure or timeout. A failure fails
    /// the whole run.
    async fn select_tools(
        &self,
        query: &str,
        available_tools: &[ToolDefinition],
        settings: &ModelSettings,
    ) -> Result<LlmSelection, LlmError>;
}

/// Optional LLM judge for semantic parameter equivalence.
///
/// Consulted only after normalized matching fails. The scorer always has a
/// deterministic fallback, so implementations may be unavailable or fail
/// without affecting run completion.
#[async_trait]
pub trait LlmJudge: Send + Sync {
    /// Whether the judge can currently be consulted.
    fn is_available(&self) -> bool {
        true
    }

    /// Judges whether two parameter values are semantically equivalent.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on provider failure; callers treat an error as
    /// "not equivalent".
    async fn judge_equivalent(&self, expected: &Value, actual: &Value) -> Result<bool, LlmError>;
}

/// Optional LLM text generator for differentiation recommendations.
#[async_trait]
pub trait LlmTextGenerator: Send + Sync {
    /// Produces a revised description for a tool given an issue summary.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on provider failure; callers degrade to
    /// issue-only output.
    async fn revise_description(
        &self,
        tool: &ToolDefinition,
        issue_summary: &str,
    ) -> Result<String, LlmError>;
}

/// Source of text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the embedding backend fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Embeds a batch of texts, preserving input order.
    ///
    /// The default embeds sequentially; implementations backed by batch APIs
    /// should override this.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when any embedding fails.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Cache handle for embeddings, keyed by content hash.
///
/// Passed explicitly into the similarity engine; never a module-level
/// singleton. A cache miss simply recomputes, so no implementation can
/// affect correctness.
pub trait EmbeddingCache: Send + Sync {
    /// Looks up a cached vector for the given text.
    fn get(&self, text: &str) -> Option<Vec<f32>>;

    /// Stores a vector for the given text. Concurrent inserts for the same
    /// text may race; either value is acceptable since both were computed
    /// from the same content.
    fn insert(&self, text: &str, vector: Vec<f32>);
}

fn content_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Concurrent in-memory embedding cache.
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingCache {
    entries: DashMap<u64, Vec<f32>>,
}

impl InMemoryEmbeddingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EmbeddingCache for InMemoryEmbeddingCache {
    fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries.get(&content_key(text)).map(|v| v.clone())
    }

    fn insert(&self, text: &str, vector: Vec<f32>) {
        self.entries.entry(content_key(text)).or_insert(vector);
    }
}

/// Cache that never stores anything; the test default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmbeddingCache;

impl EmbeddingCache for NoopEmbeddingCache {
    fn get(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }

    fn insert(&self, _text: &str, _vector: Vec<f32>) {}
}
