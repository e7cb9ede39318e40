//! Embedding-based similarity between tool definitions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::providers::{EmbeddingCache, EmbeddingProvider};
use crate::tool_def::ToolDefinition;

/// Options for similarity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityOptions {
    /// Pairs scoring at or above this are flagged. Default 0.85.
    pub threshold: f64,
    /// Whether to additionally compute full similarity (parameters
    /// included in the embedded text). The description-only score is always
    /// computed and never dropped.
    pub include_parameters: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            include_parameters: false,
        }
    }
}

/// Similarity between one pair of tools.
///
/// Symmetric by construction: entries exist for `a < b` in corpus order
/// only, and self-similarity is never computed or reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Identity of the first tool (`"{server_url}:{name}"`).
    pub tool_a_id: String,
    /// Identity of the second tool.
    pub tool_b_id: String,
    /// Cosine similarity over name + description.
    pub similarity_score: f64,
    /// Cosine similarity with parameters included, when requested.
    pub full_similarity_score: Option<f64>,
    /// Whether `similarity_score` met the configured threshold.
    pub flagged: bool,
}

/// Builds the text embedded for a tool: name and description, optionally
/// followed by flattened parameter names and descriptions.
#[must_use]
pub fn embedding_text(tool: &ToolDefinition, include_parameters: bool) -> String {
    if !include_parameters {
        return format!("{} {}", tool.name, tool.description);
    }
    let params = tool.parameters();
    if params.is_empty() {
        return format!("{} {}", tool.name, tool.description);
    }
    let names: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
    let descriptions: Vec<&str> = params.iter().filter_map(|(_, desc)| *desc).collect();
    format!(
        "{} {} {} {}",
        tool.name,
        tool.description,
        names.join(", "),
        descriptions.join(" ")
    )
}

/// Cosine similarity between two vectors, clamped to [-1, 1].
///
/// A zero vector (or mismatched/empty input) yields 0.0 rather than a
/// division by zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Builds pairwise scores from precomputed embeddings, one per tool.
///
/// Flagging is based on the description-only score, the one that drives
/// tool-selection confusion. Entries cover unordered pairs `i < j` only.
#[must_use]
pub fn scores_from_embeddings(
    tools: &[ToolDefinition],
    description_embeddings: &[Vec<f32>],
    full_embeddings: Option<&[Vec<f32>]>,
    options: &SimilarityOptions,
) -> Vec<SimilarityScore> {
    let mut scores = Vec::new();
    for i in 0..tools.len() {
        for j in (i + 1)..tools.len() {
            let similarity_score =
                cosine_similarity(&description_embeddings[i], &description_embeddings[j]);
            let full_similarity_score =
                full_embeddings.map(|e| cosine_similarity(&e[i], &e[j]));
            scores.push(SimilarityScore {
                tool_a_id: tools[i].id(),
                tool_b_id: tools[j].id(),
                similarity_score,
                full_similarity_score,
                flagged: similarity_score >= options.threshold,
            });
        }
    }
    scores
}

/// Builds the square similarity matrix from precomputed embeddings.
///
/// The diagonal is fixed at 1.0 by definition, never computed.
#[must_use]
pub fn matrix_from_embeddings(embeddings: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let score = cosine_similarity(&embeddings[i], &embeddings[j]);
            matrix[i][j] = score;
            matrix[j][i] = score;
        }
    }
    matrix
}

/// Embedding similarity engine over an injected provider and cache handle.
pub struct SimilarityEngine<'a> {
    provider: &'a dyn EmbeddingProvider,
    cache: &'a dyn EmbeddingCache,
}

impl<'a> SimilarityEngine<'a> {
    /// Creates an engine from a provider and a cache handle.
    #[must_use]
    pub fn new(provider: &'a dyn EmbeddingProvider, cache: &'a dyn EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Embeds one text per tool, consulting the cache first and batching
    /// the misses through the provider.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the provider fails.
    pub async fn embed_tools(
        &self,
        tools: &[ToolDefinition],
        include_parameters: bool,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let texts: Vec<String> = tools
            .iter()
            .map(|t| embedding_text(t, include_parameters))
            .collect();
        self.embed_texts(&texts).await
    }

    /// Embeds raw texts, cache-first, batching the misses.
    ///
    /// Results are reassembled by position, so provider completion order
    /// never affects the output.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the provider fails.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| self.cache.get(text))
            .collect();

        let miss_indices: Vec<usize> = vectors
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.is_none().then_some(i))
            .collect();

        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> =
                miss_indices.iter().map(|&i| texts[i].clone()).collect();
            debug!(
                total = texts.len(),
                misses = miss_texts.len(),
                "embedding texts"
            );
            let computed = self.provider.embed_batch(&miss_texts).await?;
            if computed.len() != miss_texts.len() {
                return Err(LlmError::MalformedResponse {
                    message: format!(
                        "embedding batch returned {} vectors for {} texts",
                        computed.len(),
                        miss_texts.len()
                    ),
                });
            }
            for (&i, vector) in miss_indices.iter().zip(computed) {
                self.cache.insert(&texts[i], vector.clone());
                vectors[i] = Some(vector);
            }
        }

        Ok(vectors.into_iter().map(|v| v.unwrap_or_default()).collect())
    }

    /// Computes pairwise similarity scores for all tool pairs.
    ///
    /// Always computes the description-only score; additionally computes
    /// the full score when `options.include_parameters` is set. Flagging is
    /// based on the description-only score, the one that drives
    /// tool-selection confusion.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when embedding fails.
    pub async fn pairwise_scores(
        &self,
        tools: &[ToolDefinition],
        options: &SimilarityOptions,
    ) -> Result<Vec<SimilarityScore>, LlmError> {
        let description_embeddings = self.embed_tools(tools, false).await?;
        let full_embeddings = if options.include_parameters {
            Some(self.embed_tools(tools, true).await?)
        } else {
            None
        };
        Ok(scores_from_embeddings(
            tools,
            &description_embeddings,
            full_embeddings.as_deref(),
            options,
        ))
    }

    /// Builds the square similarity matrix in corpus order.
    ///
    /// The diagonal is fixed at 1.0 by definition, never computed.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when embedding fails.
    pub async fn similarity_matrix(
        &self,
        tools: &[ToolDefinition],
        include_parameters: bool,
    ) -> Result<Vec<Vec<f64>>, LlmError> {
        let embeddings = self.embed_tools(tools, include_parameters).await?;
        Ok(matrix_from_embeddings(&embeddings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{InMemoryEmbeddingCache, NoopEmbeddingCache};
    use crate::stubs::StubEmbeddingProvider;
    use crate::tool_def::InputSchema;
    use serde_json::json;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition::new(name, description, "http://s1/sse")
    }

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = [0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_vector_is_zero_not_nan() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]);
        assert!((score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        assert!((cosine_similarity(&[1.0], &[1.0, 2.0]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn embedding_text_description_only() {
        let t = tool("search_web", "Search the internet");
        assert_eq!(embedding_text(&t, false), "search_web Search the internet");
    }

    #[test]
    fn embedding_text_with_parameters() {
        let schema = InputSchema::from_json(&json!({
            "properties": {
                "query": {"type": "string", "description": "Search query"}
            }
        }));
        let t = tool("search_web", "Search the internet").input_schema(schema);
        let text = embedding_text(&t, true);
        assert!(text.contains("query"));
        assert!(text.contains("Search query"));
    }

    #[tokio::test]
    async fn pairwise_scores_exclude_diagonal() {
        let tools = vec![tool("a", "first"), tool("b", "second"), tool("c", "third")];
        let provider = StubEmbeddingProvider::new(8);
        let engine = SimilarityEngine::new(&provider, &NoopEmbeddingCache);
        let scores = engine
            .pairwise_scores(&tools, &SimilarityOptions::default())
            .await
            .unwrap();
        // 3 choose 2
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| s.tool_a_id != s.tool_b_id));
    }

    #[tokio::test]
    async fn matrix_is_symmetric_with_unit_diagonal() {
        let tools = vec![tool("a", "first"), tool("b", "second")];
        let provider = StubEmbeddingProvider::new(8);
        let engine = SimilarityEngine::new(&provider, &NoopEmbeddingCache);
        let matrix = engine.similarity_matrix(&tools, false).await.unwrap();
        assert!((matrix[0][0] - 1.0).abs() < f64::EPSILON);
        assert!((matrix[1][1] - 1.0).abs() < f64::EPSILON);
        assert!((matrix[0][1] - matrix[1][0]).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn identical_tools_flagged() {
        let tools = vec![tool("a", "search the web"), tool("b", "search the web")];
        // Same description, different names, but the stub embeds per text;
        // force identity by using the same name too.
        let tools_same = vec![
            ToolDefinition::new("search", "search the web", "http://s1/sse"),
            ToolDefinition::new("search", "search the web", "http://s2/sse"),
        ];
        let provider = StubEmbeddingProvider::new(8);
        let engine = SimilarityEngine::new(&provider, &NoopEmbeddingCache);

        let scores = engine
            .pairwise_scores(&tools_same, &SimilarityOptions::default())
            .await
            .unwrap();
        assert!(scores[0].flagged);
        assert!((scores[0].similarity_score - 1.0).abs() < 1e-9);

        let scores = engine
            .pairwise_scores(&tools, &SimilarityOptions::default())
            .await
            .unwrap();
        assert!(scores[0].full_similarity_score.is_none());
    }

    #[tokio::test]
    async fn full_mode_reports_both_scores() {
        let tools = vec![tool("a", "first"), tool("b", "second")];
        let provider = StubEmbeddingProvider::new(8);
        let engine = SimilarityEngine::new(&provider, &NoopEmbeddingCache);
        let options = SimilarityOptions {
            include_parameters: true,
            ..SimilarityOptions::default()
        };
        let scores = engine.pairwise_scores(&tools, &options).await.unwrap();
        assert!(scores[0].full_similarity_score.is_some());
    }

    #[tokio::test]
    async fn cache_serves_repeat_requests() {
        let tools = vec![tool("a", "first"), tool("b", "second")];
        let provider = StubEmbeddingProvider::new(8);
        let cache = InMemoryEmbeddingCache::new();
        let engine = SimilarityEngine::new(&provider, &cache);

        engine.embed_tools(&tools, false).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(provider.call_count(), 1);

        engine.embed_tools(&tools, false).await.unwrap();
        assert_eq!(provider.call_count(), 1);
    }
}
