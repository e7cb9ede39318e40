//! Corpus-level analysis surfaces: similarity, overlap, recommendations.
//!
//! These wrap the engines with validation and report metadata so callers
//! get a self-describing artifact rather than a bare vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EvalError, ValidationError};
use crate::overlap::{OverlapEntry, OverlapWeights, compute_overlap};
use crate::providers::{EmbeddingCache, EmbeddingProvider, LlmTextGenerator};
use crate::recommend::{Recommendation, RecommendConfig, generate_recommendations};
use crate::similarity::{
    SimilarityEngine, SimilarityOptions, SimilarityScore, matrix_from_embeddings,
    scores_from_embeddings,
};
use crate::tool_def::ToolDefinition;

/// Report metadata common to every analysis artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    /// When the analysis ran.
    pub generated_at: DateTime<Utc>,
    /// Version of the engine that produced the report.
    pub engine_version: String,
    /// Number of tools analyzed.
    pub tool_count: usize,
}

impl ReportMeta {
    fn now(tool_count: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            tool_count,
        }
    }
}

/// Pairwise similarity analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Report metadata.
    pub meta: ReportMeta,
    /// Options the analysis ran with.
    pub options: SimilarityOptions,
    /// Scores for every unordered pair.
    pub scores: Vec<SimilarityScore>,
    /// Square similarity matrix in corpus order.
    pub matrix: Vec<Vec<f64>>,
    /// Number of pairs at or above the flag threshold.
    pub flagged_pairs: usize,
}

/// Weighted overlap analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    /// Report metadata.
    pub meta: ReportMeta,
    /// Weights the blend ran with.
    pub weights: OverlapWeights,
    /// One entry per unordered pair.
    pub entries: Vec<OverlapEntry>,
}

/// Differentiation recommendation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    /// Report metadata.
    pub meta: ReportMeta,
    /// Recommendations for every over-threshold pair.
    pub recommendations: Vec<Recommendation>,
}

fn require_at_least_two(tools: &[ToolDefinition]) -> Result<(), ValidationError> {
    if tools.len() < 2 {
        return Err(ValidationError::TooFewTools {
            tool_count: tools.len(),
        });
    }
    Ok(())
}

/// Corpus analyzer over an embedding provider and cache handle.
pub struct ToolAnalyzer<'a> {
    provider: &'a dyn EmbeddingProvider,
    cache: &'a dyn EmbeddingCache,
}

impl<'a> ToolAnalyzer<'a> {
    /// Creates an analyzer from a provider and a cache handle.
    #[must_use]
    pub fn new(provider: &'a dyn EmbeddingProvider, cache: &'a dyn EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Runs pairwise similarity analysis over the tool corpus.
    ///
    /// # Errors
    ///
    /// Returns a validation error for fewer than two tools, or the
    /// embedding provider's error.
    pub async fn analyze_similarity(
        &self,
        tools: &[ToolDefinition],
        options: &SimilarityOptions,
    ) -> Result<SimilarityReport, EvalError> {
        require_at_least_two(tools)?;
        let engine = SimilarityEngine::new(self.provider, self.cache);
        // Embed the corpus once; the score list and the matrix are both
        // derived from the same vectors.
        let description_embeddings = engine.embed_tools(tools, false).await?;
        let full_embeddings = if options.include_parameters {
            Some(engine.embed_tools(tools, true).await?)
        } else {
            None
        };
        let scores = scores_from_embeddings(
            tools,
            &description_embeddings,
            full_embeddings.as_deref(),
            options,
        );
        let matrix = matrix_from_embeddings(
            full_embeddings.as_deref().unwrap_or(&description_embeddings),
        );
        let flagged_pairs = scores.iter().filter(|s| s.flagged).count();
        info!(
            tools = tools.len(),
            pairs = scores.len(),
            flagged = flagged_pairs,
            "similarity analysis complete"
        );
        Ok(SimilarityReport {
            meta: ReportMeta::now(tools.len()),
            options: *options,
            scores,
            matrix,
            flagged_pairs,
        })
    }

    /// Computes weighted functional overlap over the tool corpus.
    ///
    /// # Errors
    ///
    /// Returns a validation error for fewer than two tools, or the
    /// embedding provider's error.
    pub async fn analyze_overlap(
        &self,
        tools: &[ToolDefinition],
        weights: OverlapWeights,
    ) -> Result<OverlapReport, EvalError> {
        require_at_least_two(tools)?;
        let entries = compute_overlap(tools, self.provider, self.cache, weights).await?;
        info!(
            tools = tools.len(),
            pairs = entries.len(),
            "overlap analysis complete"
        );
        Ok(OverlapReport {
            meta: ReportMeta::now(tools.len()),
            weights,
            entries,
        })
    }

    /// Produces differentiation recommendations for overlapping pairs.
    ///
    /// # Errors
    ///
    /// Returns a validation error for fewer than two tools, or the
    /// embedding provider's error. A failing text generator never fails the
    /// analysis.
    pub async fn recommend(
        &self,
        tools: &[ToolDefinition],
        weights: OverlapWeights,
        config: &RecommendConfig,
        generator: Option<&dyn LlmTextGenerator>,
    ) -> Result<RecommendationReport, EvalError> {
        require_at_least_two(tools)?;
        let entries = compute_overlap(tools, self.provider, self.cache, weights).await?;
        let recommendations = generate_recommendations(tools, &entries, config, generator).await;
        info!(
            tools = tools.len(),
            recommendations = recommendations.len(),
            "recommendation analysis complete"
        );
        Ok(RecommendationReport {
            meta: ReportMeta::now(tools.len()),
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{InMemoryEmbeddingCache, NoopEmbeddingCache};
    use crate::stubs::StubEmbeddingProvider;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition::new(name, description, "http://srv/sse")
    }

    #[tokio::test]
    async fn similarity_requires_two_tools() {
        let provider = StubEmbeddingProvider::new(8);
        let cache = InMemoryEmbeddingCache::new();
        let analyzer = ToolAnalyzer::new(&provider, &cache);

        let err = analyzer
            .analyze_similarity(&[tool("only", "one tool")], &SimilarityOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::Validation(ValidationError::TooFewTools { tool_count: 1 })
        ));
    }

    #[tokio::test]
    async fn similarity_report_carries_metadata() {
        let tools = vec![tool("a", "search for pages"), tool("b", "send to inboxes")];
        let provider = StubEmbeddingProvider::new(8);
        let cache = InMemoryEmbeddingCache::new();
        let analyzer = ToolAnalyzer::new(&provider, &cache);

        let report = analyzer
            .analyze_similarity(&tools, &SimilarityOptions::default())
            .await
            .unwrap();
        assert_eq!(report.meta.tool_count, 2);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.matrix.len(), 2);
        assert!(!report.meta.engine_version.is_empty());
    }

    #[tokio::test]
    async fn identical_pair_is_flagged_and_recommended() {
        let tools = vec![
            ToolDefinition::new("search", "Search the web", "http://a/sse"),
            ToolDefinition::new("search", "Search the web", "http://b/sse"),
        ];
        let provider = StubEmbeddingProvider::new(8);
        let cache = InMemoryEmbeddingCache::new();
        let analyzer = ToolAnalyzer::new(&provider, &cache);

        let similarity = analyzer
            .analyze_similarity(&tools, &SimilarityOptions::default())
            .await
            .unwrap();
        assert_eq!(similarity.flagged_pairs, 1);

        let recommendations = analyzer
            .recommend(
                &tools,
                OverlapWeights::default(),
                &RecommendConfig::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(recommendations.recommendations.len(), 1);
        assert!(!recommendations.recommendations[0].issues.is_empty());
    }

    #[tokio::test]
    async fn similarity_embeds_the_corpus_once() {
        let tools = vec![tool("a", "search for pages"), tool("b", "send to inboxes")];
        let provider = StubEmbeddingProvider::new(8);
        let analyzer = ToolAnalyzer::new(&provider, &NoopEmbeddingCache);

        // Even without a cache, scores and matrix come from one embedding
        // pass over the corpus.
        let report = analyzer
            .analyze_similarity(&tools, &SimilarityOptions::default())
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 1);
        assert!(
            (report.scores[0].similarity_score - report.matrix[0][1]).abs() < f64::EPSILON
        );
    }

    #[tokio::test]
    async fn overlap_report_reuses_cache_across_analyses() {
        let tools = vec![tool("a", "search for pages"), tool("b", "send to inboxes")];
        let provider = StubEmbeddingProvider::new(8);
        let cache = InMemoryEmbeddingCache::new();
        let analyzer = ToolAnalyzer::new(&provider, &cache);

        analyzer
            .analyze_overlap(&tools, OverlapWeights::default())
            .await
            .unwrap();
        let calls_after_first = provider.call_count();
        analyzer
            .analyze_overlap(&tools, OverlapWeights::default())
            .await
            .unwrap();
        assert_eq!(provider.call_count(), calls_after_first);
    }
}
