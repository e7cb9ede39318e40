//! Functional overlap scoring across a tool corpus.
//!
//! Combines three independent signals per tool pair: semantic similarity
//! from embeddings, parameter-name overlap (Jaccard), and description
//! overlap (corpus TF-IDF cosine). The weighted blend is what downstream
//! recommendation logic thresholds against.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::providers::{EmbeddingCache, EmbeddingProvider};
use crate::similarity::{SimilarityEngine, cosine_similarity, embedding_text};
use crate::tfidf::TfIdfModel;
use crate::tool_def::ToolDefinition;

/// Blend weights for the three overlap signals.
///
/// Weights are applied as-is; callers wanting a convex combination should
/// keep them summing to 1.0, as the defaults do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapWeights {
    /// Weight on embedding cosine similarity.
    pub semantic: f64,
    /// Weight on parameter-name Jaccard overlap.
    pub parameter: f64,
    /// Weight on description TF-IDF cosine.
    pub description: f64,
}

impl Default for OverlapWeights {
    fn default() -> Self {
        Self {
            semantic: 0.5,
            parameter: 0.3,
            description: 0.2,
        }
    }
}

/// Overlap signals for one tool pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapEntry {
    /// Composite id of the first tool.
    pub tool_a_id: String,
    /// Composite id of the second tool.
    pub tool_b_id: String,
    /// Embedding cosine similarity.
    pub semantic: f64,
    /// Jaccard overlap of parameter name sets.
    pub parameter_overlap: f64,
    /// TF-IDF cosine of the descriptions.
    pub description_overlap: f64,
    /// Weighted blend of the three signals.
    pub weighted_overlap: f64,
}

/// Jaccard overlap of two tools' parameter name sets.
///
/// Two tools that both take no parameters are indistinguishable on this
/// axis, so the overlap is 1.0, not 0.0.
#[must_use]
pub fn parameter_jaccard(a: &ToolDefinition, b: &ToolDefinition) -> f64 {
    let names_a: BTreeSet<&str> = a.parameters().into_iter().map(|(name, _)| name).collect();
    let names_b: BTreeSet<&str> = b.parameters().into_iter().map(|(name, _)| name).collect();
    if names_a.is_empty() && names_b.is_empty() {
        return 1.0;
    }
    let intersection = names_a.intersection(&names_b).count();
    let union = names_a.union(&names_b).count();
    #[allow(clippy::cast_precision_loss)]
    let jaccard = intersection as f64 / union as f64;
    jaccard
}

/// Computes pairwise overlap entries for a tool corpus.
///
/// Embeddings go through the similarity engine (and its cache); the TF-IDF
/// model is fitted over all descriptions in one pass so term rarity is
/// corpus-wide. Entries cover unordered pairs `i < j` only.
///
/// # Errors
///
/// Returns the embedding provider's error if any tool fails to embed.
pub async fn compute_overlap(
    tools: &[ToolDefinition],
    provider: &dyn EmbeddingProvider,
    cache: &dyn EmbeddingCache,
    weights: OverlapWeights,
) -> Result<Vec<OverlapEntry>, LlmError> {
    let engine = SimilarityEngine::new(provider, cache);
    let texts: Vec<String> = tools.iter().map(|t| embedding_text(t, false)).collect();
    let vectors = engine.embed_texts(&texts).await?;

    let descriptions: Vec<String> = tools.iter().map(|t| t.description.clone()).collect();
    let tfidf = TfIdfModel::fit(&descriptions);

    let mut entries = Vec::new();
    for i in 0..tools.len() {
        for j in (i + 1)..tools.len() {
            let semantic = cosine_similarity(&vectors[i], &vectors[j]);
            let parameter_overlap = parameter_jaccard(&tools[i], &tools[j]);
            let description_overlap = tfidf.cosine(i, j);
            let weighted_overlap = weights.semantic * semantic
                + weights.parameter * parameter_overlap
                + weights.description * description_overlap;
            entries.push(OverlapEntry {
                tool_a_id: tools[i].id(),
                tool_b_id: tools[j].id(),
                semantic,
                parameter_overlap,
                description_overlap,
                weighted_overlap,
            });
        }
    }
    Ok(entries)
}
