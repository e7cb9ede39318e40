//! Deterministic stub collaborators for tests and examples.
//!
//! These never touch a network or a model. The stub embedder derives a
//! vector from a hash of the text, so identical texts always embed
//! identically and similarity results are reproducible.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{ConnectivityError, LlmError};
use crate::providers::{EmbeddingProvider, LlmSelection, LlmToolCaller, ModelSettings, ToolSource, Transport};
use crate::run::{ActualToolCall, ConfidenceLevel};
use crate::tool_def::ToolDefinition;

/// Hash-based deterministic embedding provider.
#[derive(Debug)]
pub struct StubEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
}

impl StubEmbeddingProvider {
    /// Creates a stub producing vectors of the given dimension.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of provider calls made (single and batch each count once).
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;
        (0..self.dimensions)
            .map(|_| {
                // xorshift64 keeps the sequence cheap and reproducible.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                #[allow(clippy::cast_precision_loss)]
                let unit = (state % 2000) as f32 / 1000.0 - 1.0;
                unit
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Tool source backed by a fixed map of server URL to tool definitions.
///
/// Unknown servers fail with [`ConnectivityError::Unreachable`], which makes
/// fail-fast ingestion testable without a network.
#[derive(Debug, Default)]
pub struct StaticToolSource {
    servers: HashMap<String, Vec<ToolDefinition>>,
}

impl StaticToolSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the tools a server publishes.
    #[must_use]
    pub fn with_server(
        mut self,
        server_url: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        self.servers.insert(server_url.into(), tools);
        self
    }
}

#[async_trait]
impl ToolSource for StaticToolSource {
    async fn fetch_tools(
        &self,
        server_url: &str,
        _transport: Transport,
    ) -> Result<Vec<ToolDefinition>, ConnectivityError> {
        self.servers
            .get(server_url)
            .cloned()
            .ok_or_else(|| ConnectivityError::Unreachable {
                server_url: server_url.to_string(),
                message: "no such server registered".to_string(),
            })
    }
}

/// Tool caller that replays a scripted trace.
#[derive(Debug)]
pub struct ScriptedToolCaller {
    tool_calls: Vec<ActualToolCall>,
    confidence: Option<ConfidenceLevel>,
    fail_with: Option<LlmError>,
}

impl ScriptedToolCaller {
    /// Creates a caller that returns the given trace.
    #[must_use]
    pub fn new(tool_calls: Vec<ActualToolCall>) -> Self {
        Self {
            tool_calls,
            confidence: Some(ConfidenceLevel::High),
            fail_with: None,
        }
    }

    /// Sets the reported confidence.
    #[must_use]
    pub fn confidence(mut self, confidence: Option<ConfidenceLevel>) -> Self {
        self.confidence = confidence;
        self
    }

    /// Makes the caller fail instead of answering.
    #[must_use]
    pub fn failing(error: LlmError) -> Self {
        Self {
            tool_calls: Vec::new(),
            confidence: None,
            fail_with: Some(error),
        }
    }
}

#[async_trait]
impl LlmToolCaller for ScriptedToolCaller {
    async fn select_tools(
        &self,
        _query: &str,
        _available_tools: &[ToolDefinition],
        _settings: &ModelSettings,
    ) -> Result<LlmSelection, LlmError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        Ok(LlmSelection {
            tool_calls: self.tool_calls.clone(),
            confidence: self.confidence,
            raw_response: "{\"stub\":true}".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embeddings_are_deterministic() {
        let provider = StubEmbeddingProvider::new(16);
        let a = provider.embed("search the web").await.unwrap();
        let b = provider.embed("search the web").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let c = provider.embed("different text").await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn static_source_fails_for_unknown_server() {
        let source = StaticToolSource::new();
        let err = source
            .fetch_tools("http://missing/sse", Transport::Sse)
            .await
            .unwrap_err();
        assert_eq!(err.server_url(), "http://missing/sse");
    }
}
