//! Aggregation of classified runs into summary metrics.

use serde::{Deserialize, Serialize};

use crate::run::{Classification, ConfidenceCategory, RunStatus, TestRun};

/// Converts a count to f64 for ratio calculations.
///
/// Run counts fit comfortably in u32, which converts to f64 without
/// precision loss.
///
/// # Panics
///
/// Panics if the count exceeds `u32::MAX`.
#[inline]
pub(crate) fn count_as_f64(count: usize) -> f64 {
    f64::from(u32::try_from(count).expect("run count exceeds u32::MAX"))
}

/// Counts per confidence category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    /// Runs categorized as robust.
    pub robust: usize,
    /// Runs categorized as needing clarity.
    pub needs_clarity: usize,
    /// Runs categorized as misleading.
    pub misleading: usize,
}

/// Aggregated metrics over a collection of completed runs.
///
/// Ratios with a zero denominator are `None` (reported as null), never 0.0
/// or NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Completed runs included in the aggregation.
    pub total_runs: usize,
    /// Runs classified TP.
    pub true_positives: usize,
    /// Runs classified FP.
    pub false_positives: usize,
    /// Runs classified TN.
    pub true_negatives: usize,
    /// Runs classified FN.
    pub false_negatives: usize,
    /// TP / (TP + FP); `None` when no positive selections were made.
    pub precision: Option<f64>,
    /// TP / (TP + FN); `None` when nothing was expected.
    pub recall: Option<f64>,
    /// Harmonic mean of precision and recall; `None` when either is
    /// undefined or both are zero.
    pub f1: Option<f64>,
    /// Mean of `avg_parameter_correctness` over runs where present (0-10).
    pub parameter_accuracy: Option<f64>,
    /// Counts per confidence category.
    pub confidence_distribution: ConfidenceDistribution,
    /// Mean execution time over runs that recorded one, in milliseconds.
    pub average_execution_time_ms: Option<f64>,
}

/// Folds completed runs into a metrics summary.
///
/// Non-completed runs (pending, running, failed) are excluded; an empty
/// input yields all-`None` ratios rather than an error.
#[must_use]
pub fn aggregate_metrics<'a, I>(runs: I) -> MetricsSummary
where
    I: IntoIterator<Item = &'a TestRun>,
{
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut tn = 0usize;
    let mut fn_ = 0usize;
    let mut total = 0usize;
    let mut distribution = ConfidenceDistribution::default();
    let mut correctness_values = Vec::new();
    let mut execution_times = Vec::new();

    for run in runs {
        if run.status != RunStatus::Completed {
            continue;
        }
        total += 1;
        match run.classification {
            Some(Classification::TruePositive) => tp += 1,
            Some(Classification::FalsePositive) => fp += 1,
            Some(Classification::TrueNegative) => tn += 1,
            Some(Classification::FalseNegative) => fn_ += 1,
            None => {}
        }
        match run.confidence_category {
            Some(ConfidenceCategory::Robust) => distribution.robust += 1,
            Some(ConfidenceCategory::NeedsClarity) => distribution.needs_clarity += 1,
            Some(ConfidenceCategory::Misleading) => distribution.misleading += 1,
            None => {}
        }
        if let Some(v) = run.avg_parameter_correctness {
            correctness_values.push(v);
        }
        if let Some(ms) = run.execution_time_ms {
            #[allow(clippy::cast_precision_loss)]
            execution_times.push(ms as f64);
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = match (precision, recall) {
        (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
        _ => None,
    };

    MetricsSummary {
        total_runs: total,
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fn_,
        precision,
        recall,
        f1,
        parameter_accuracy: mean(&correctness_values),
        confidence_distribution: distribution,
        average_execution_time_ms: mean(&execution_times),
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        return None;
    }
    Some(count_as_f64(numerator) / count_as_f64(denominator))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / count_as_f64(values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::TestRun;

    fn completed(classification: Classification) -> TestRun {
        let mut run = TestRun::pending("case");
        run.status = RunStatus::Completed;
        run.classification = Some(classification);
        run
    }

    #[test]
    fn empty_input_yields_null_ratios() {
        let summary = aggregate_metrics([]);
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.precision, None);
        assert_eq!(summary.recall, None);
        assert_eq!(summary.f1, None);
        assert_eq!(summary.parameter_accuracy, None);
    }

    #[test]
    fn known_counts_produce_expected_ratios() {
        let runs: Vec<TestRun> = [
            Classification::TruePositive,
            Classification::TruePositive,
            Classification::TruePositive,
            Classification::FalsePositive,
            Classification::FalseNegative,
        ]
        .into_iter()
        .map(completed)
        .collect();

        let summary = aggregate_metrics(&runs);
        assert_eq!(summary.true_positives, 3);
        assert!((summary.precision.unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((summary.recall.unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((summary.f1.unwrap() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn only_tn_runs_leave_precision_and_recall_null() {
        let runs = vec![completed(Classification::TrueNegative)];
        let summary = aggregate_metrics(&runs);
        assert_eq!(summary.total_runs, 1);
        assert_eq!(summary.precision, None);
        assert_eq!(summary.recall, None);
        assert_eq!(summary.f1, None);
    }

    #[test]
    fn non_completed_runs_excluded() {
        let mut failed = TestRun::pending("failing");
        failed.status = RunStatus::Failed;
        failed.error_message = Some("server unreachable".to_string());

        let runs = vec![failed, completed(Classification::TruePositive)];
        let summary = aggregate_metrics(&runs);
        assert_eq!(summary.total_runs, 1);
        assert_eq!(summary.true_positives, 1);
    }

    #[test]
    fn parameter_accuracy_ignores_runs_without_tp() {
        let mut with_score = completed(Classification::TruePositive);
        with_score.avg_parameter_correctness = Some(8.0);
        let without_score = completed(Classification::FalseNegative);

        let summary = aggregate_metrics([&with_score, &without_score]);
        assert_eq!(summary.parameter_accuracy, Some(8.0));
    }

    #[test]
    fn confidence_distribution_counted() {
        let mut robust = completed(Classification::TruePositive);
        robust.confidence_category = Some(ConfidenceCategory::Robust);
        let mut misleading = completed(Classification::FalsePositive);
        misleading.confidence_category = Some(ConfidenceCategory::Misleading);

        let summary = aggregate_metrics([&robust, &misleading]);
        assert_eq!(summary.confidence_distribution.robust, 1);
        assert_eq!(summary.confidence_distribution.misleading, 1);
        assert_eq!(summary.confidence_distribution.needs_clarity, 0);
    }

    #[test]
    fn null_ratios_serialize_as_json_null() {
        let summary = aggregate_metrics([]);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["precision"].is_null());
        assert!(json["f1"].is_null());
    }
}
