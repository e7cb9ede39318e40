//! TF-IDF vectorization over a tool-description corpus.
//!
//! Fitted corpus-wide, never pairwise, so term rarity across the whole
//! tool set drives the weights. Uses the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1` with l2-normalized rows.

use std::collections::{BTreeMap, HashSet};

/// Common English words carrying no distinguishing weight.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can", "do", "does",
    "for", "from", "get", "has", "have", "if", "in", "into", "is", "it", "its", "not", "of", "on",
    "or", "that", "the", "their", "then", "this", "to", "use", "used", "using", "was", "were",
    "which", "will", "with", "you", "your",
];

fn tokenize(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 1 && !stop.contains(token))
        .map(String::from)
        .collect()
}

/// A TF-IDF model fitted over one document corpus.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    /// Term to column index, in deterministic (sorted) order.
    vocabulary: BTreeMap<String, usize>,
    /// One l2-normalized weight row per document.
    rows: Vec<Vec<f64>>,
}

impl TfIdfModel {
    /// Fits the model over the given documents.
    ///
    /// Empty documents produce all-zero rows; their cosine against anything
    /// is 0.0.
    #[must_use]
    pub fn fit(documents: &[String]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

        let mut vocabulary = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                let next = vocabulary.len();
                vocabulary.entry(token.clone()).or_insert(next);
            }
        }
        // Reassign indices in sorted term order for determinism.
        for (idx, (_, slot)) in vocabulary.iter_mut().enumerate() {
            *slot = idx;
        }

        let n_docs = documents.len();
        let mut document_frequency = vec![0usize; vocabulary.len()];
        for tokens in &tokenized {
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                document_frequency[vocabulary[token]] += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut row = vec![0.0f64; vocabulary.len()];
                for token in tokens {
                    row[vocabulary[token]] += 1.0;
                }
                for (weight, idf) in row.iter_mut().zip(&idf) {
                    *weight *= idf;
                }
                let norm = row.iter().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for weight in &mut row {
                        *weight /= norm;
                    }
                }
                row
            })
            .collect();

        Self { vocabulary, rows }
    }

    /// Number of fitted documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the corpus was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cosine similarity between two fitted documents.
    ///
    /// Rows are l2-normalized, so this is a plain dot product.
    #[must_use]
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (&self.rows[i], &self.rows[j]);
        a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>().clamp(-1.0, 1.0)
    }

    /// Full square similarity matrix in corpus order.
    #[must_use]
    pub fn similarity_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.rows.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let score = self.cosine(i, j);
                matrix[i][j] = score;
                matrix[j][i] = score;
            }
        }
        matrix
    }

    /// The `n` most distinctive terms of a document, by TF-IDF weight.
    ///
    /// Ties break alphabetically so the result is deterministic.
    #[must_use]
    pub fn top_terms(&self, doc: usize, n: usize) -> Vec<String> {
        let mut weighted: Vec<(&String, f64)> = self
            .vocabulary
            .iter()
            .filter_map(|(term, &idx)| {
                let weight = self.rows[doc][idx];
                (weight > 0.0).then_some((term, weight))
            })
            .collect();
        weighted.sort_by(|(term_a, weight_a), (term_b, weight_b)| {
            weight_b
                .partial_cmp(weight_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| term_a.cmp(term_b))
        });
        weighted
            .into_iter()
            .take(n)
            .map(|(term, _)| term.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn identical_documents_score_one() {
        let model = TfIdfModel::fit(&docs(&[
            "search the web for pages",
            "search the web for pages",
            "send an email message",
        ]));
        assert!((model.cosine(0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_documents_score_zero() {
        let model = TfIdfModel::fit(&docs(&[
            "search web pages",
            "send email messages",
        ]));
        assert!(model.cosine(0, 1).abs() < 1e-9);
    }

    #[test]
    fn rare_terms_outweigh_common_ones() {
        // "weather" appears in two docs, "forecast"/"alerts" once each.
        let model = TfIdfModel::fit(&docs(&[
            "weather forecast",
            "weather alerts",
            "stock prices",
        ]));
        let top = model.top_terms(0, 1);
        assert_eq!(top, ["forecast".to_string()]);
    }

    #[test]
    fn empty_document_scores_zero_everywhere() {
        let model = TfIdfModel::fit(&docs(&["", "search web"]));
        assert!(model.cosine(0, 1).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_words_excluded() {
        let model = TfIdfModel::fit(&docs(&["the of and to", "search web"]));
        // First doc is all stop words; nothing overlaps.
        assert!(model.cosine(0, 1).abs() < f64::EPSILON);
        assert!(model.top_terms(0, 5).is_empty());
    }

    #[test]
    fn matrix_symmetric_with_unit_diagonal() {
        let model = TfIdfModel::fit(&docs(&[
            "search web pages",
            "search web sites",
            "send email",
        ]));
        let m = model.similarity_matrix();
        for i in 0..3 {
            assert!((m[i][i] - 1.0).abs() < f64::EPSILON);
            for j in 0..3 {
                assert!((m[i][j] - m[j][i]).abs() < f64::EPSILON);
            }
        }
    }
}
