//! Run-level classification from the per-call match list.

use crate::run::{Classification, ConfidenceCategory, ConfidenceLevel, MatchType, ToolCallMatch};

/// Counts of each match kind in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    /// TP matches.
    pub tp: usize,
    /// FP matches.
    pub fp: usize,
    /// FN matches.
    pub fn_: usize,
    /// TN matches.
    pub tn: usize,
}

impl MatchCounts {
    /// Tallies a match list.
    #[must_use]
    pub fn tally(matches: &[ToolCallMatch]) -> Self {
        let mut counts = Self::default();
        for m in matches {
            match m.match_type {
                MatchType::TruePositive => counts.tp += 1,
                MatchType::FalsePositive => counts.fp += 1,
                MatchType::FalseNegative => counts.fn_ += 1,
                MatchType::TrueNegative => counts.tn += 1,
            }
        }
        counts
    }
}

/// The classification priority order, as an explicit rule table.
///
/// Rules are evaluated top to bottom; the first predicate that holds wins.
/// The order is a design decision, not incidental: a missed expected call
/// (FN) outranks a spurious call (FP) because tool-selection failure is a
/// correctness issue before it is a noise issue. This makes the priority
/// law "≥1 FN and ≥1 FP and 0 TP classifies as FN" hold by construction.
const CLASSIFICATION_RULES: &[(fn(MatchCounts) -> bool, Classification)] = &[
    (
        |c| c.tp == 0 && c.fp == 0 && c.fn_ == 0,
        Classification::TrueNegative,
    ),
    (
        |c| c.tp >= 1 && c.fn_ == 0 && c.fp == 0,
        Classification::TruePositive,
    ),
    (|c| c.fn_ >= 1, Classification::FalseNegative),
];

/// Reduces a run's match list to a single classification.
///
/// Priority order: TN (nothing expected, nothing called), then TP (every
/// expected call matched, nothing spurious), then FN (any expected call
/// missed, even alongside FPs), then FP.
#[must_use]
pub fn classify(matches: &[ToolCallMatch]) -> Classification {
    let counts = MatchCounts::tally(matches);
    CLASSIFICATION_RULES
        .iter()
        .find(|(predicate, _)| predicate(counts))
        // The remaining combinations all have fp >= 1 with no FN.
        .map_or(Classification::FalsePositive, |(_, c)| *c)
}

/// Derives the confidence category from LLM confidence and classification.
///
/// High confidence on a correct run is robust; high confidence on a wrong
/// run means the tool descriptions actively misled the model; low
/// confidence needs clarity either way.
#[must_use]
pub fn confidence_category(
    confidence: ConfidenceLevel,
    classification: Classification,
) -> ConfidenceCategory {
    let correct = matches!(
        classification,
        Classification::TruePositive | Classification::TrueNegative
    );
    match (confidence, correct) {
        (ConfidenceLevel::High, true) => ConfidenceCategory::Robust,
        (ConfidenceLevel::High, false) => ConfidenceCategory::Misleading,
        (ConfidenceLevel::Low, _) => ConfidenceCategory::NeedsClarity,
    }
}

/// Mean of TP `parameter_correctness` values; `None` without TP matches.
#[must_use]
pub fn avg_parameter_correctness(matches: &[ToolCallMatch]) -> Option<f64> {
    let scores: Vec<f64> = matches
        .iter()
        .filter(|m| m.match_type == MatchType::TruePositive)
        .filter_map(|m| m.parameter_correctness)
        .collect();
    if scores.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
