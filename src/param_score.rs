//! Parameter correctness scoring for one matched tool call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::providers::LlmJudge;
use crate::schema_match::{check_schema, SchemaReport};
use crate::tool_def::InputSchema;

/// Scoring penalties. Weights are configuration, not magic numbers; the
/// defaults are 2.0 per hallucinated field and 1.0 per type mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points subtracted per hallucinated field.
    pub hallucination_penalty: f64,
    /// Points subtracted per type-mismatched field.
    pub type_mismatch_penalty: f64,
    /// Absolute tolerance for numeric equality.
    pub numeric_tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hallucination_penalty: 2.0,
            type_mismatch_penalty: 1.0,
            numeric_tolerance: 1e-9,
        }
    }
}

/// Result of scoring one matched call's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterScore {
    /// Correctness in [0, 10].
    pub score: f64,
    /// Which penalties applied, in human-readable form.
    pub justification: String,
    /// The underlying schema report.
    pub schema_report: SchemaReport,
}

/// Normalized equality between an expected and an actual parameter value.
///
/// Strings compare case-insensitively after trimming; numbers compare as
/// f64 within `tolerance`; booleans accept their usual string spellings.
/// Falls back to comparing normalized string forms, mirroring how test
/// authors write expected values.
#[must_use]
pub fn values_equivalent(expected: &Value, actual: &Value, tolerance: f64) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::String(e), Value::String(a)) => {
            e.trim().to_lowercase() == a.trim().to_lowercase()
        }
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(e), Some(a)) => (e - a).abs() <= tolerance,
            _ => false,
        },
        (Value::Bool(e), Value::String(a)) => {
            let truthy = matches!(a.trim().to_lowercase().as_str(), "true" | "yes" | "1");
            *e == truthy
        }
        _ => normalize_to_string(expected) == normalize_to_string(actual),
    }
}

fn normalize_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string().trim().to_lowercase(),
    }
}

/// Scores the actual parameters of a matched call against the expected
/// parameters and the tool's declared schema.
///
/// The score ceiling is the completeness ratio scaled to 10: the share of
/// expected parameters that are present with a correct value. Hallucination
/// and type-mismatch penalties subtract from that ceiling, flooring at 0.
/// An empty expected set means "no parameters expected" and starts at 10.
///
/// The optional judge is consulted only for expected parameters whose
/// normalized comparison failed; a missing, unavailable, or failing judge
/// leaves the deterministic result in place.
pub async fn score_parameters(
    expected: &BTreeMap<String, Value>,
    actual: &BTreeMap<String, Value>,
    schema: &InputSchema,
    config: &ScoringConfig,
    judge: Option<&dyn LlmJudge>,
) -> ParameterScore {
    let schema_report = check_schema(schema, actual);

    let total_expected = expected.len();
    let mut correct_present = 0usize;
    let mut missing: Vec<&str> = Vec::new();
    let mut incorrect: Vec<&str> = Vec::new();

    for (name, expected_value) in expected {
        match actual.get(name) {
            None => missing.push(name),
            Some(actual_value) => {
                let mut ok = values_equivalent(expected_value, actual_value, config.numeric_tolerance);
                if !ok && let Some(judge) = judge
                    && judge.is_available()
                {
                    match judge.judge_equivalent(expected_value, actual_value).await {
                        Ok(equivalent) => ok = equivalent,
                        Err(e) => {
                            debug!(parameter = %name, error = %e, "LLM judge failed, keeping deterministic result");
                        }
                    }
                }
                if ok {
                    correct_present += 1;
                } else {
                    incorrect.push(name);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let ceiling = if total_expected == 0 {
        10.0
    } else {
        10.0 * (correct_present as f64) / (total_expected as f64)
    };

    #[allow(clippy::cast_precision_loss)]
    let penalties = config.hallucination_penalty * schema_report.hallucinated.len() as f64
        + config.type_mismatch_penalty * schema_report.type_mismatches.len() as f64;

    let score = (ceiling - penalties).clamp(0.0, 10.0);

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing params: {}", missing.join(", ")));
    }
    if !incorrect.is_empty() {
        parts.push(format!(
            "Incorrect values: {}/{} ({})",
            incorrect.len(),
            total_expected,
            incorrect.join(", ")
        ));
    }
    if !schema_report.hallucinated.is_empty() {
        parts.push(format!(
            "Hallucinated params: {} (-{} each)",
            schema_report.hallucinated.join(", "),
            config.hallucination_penalty
        ));
    }
    if !schema_report.type_mismatches.is_empty() {
        let names: Vec<&str> = schema_report
            .type_mismatches
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        parts.push(format!(
            "Type mismatches: {} (-{} each)",
            names.join(", "),
            config.type_mismatch_penalty
        ));
    }

    let justification = if parts.is_empty() {
        if total_expected == 0 {
            "No parameters expected, full score".to_string()
        } else {
            "Perfect parameter match".to_string()
        }
    } else {
        parts.join("; ")
    };

    ParameterScore {
        score,
        justification,
        schema_report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_def::{PropertySchema, SchemaType};
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn city_date_schema() -> InputSchema {
        let mut props = BTreeMap::new();
        props.insert("city".to_string(), PropertySchema::new(SchemaType::String));
        props.insert("date".to_string(), PropertySchema::new(SchemaType::String));
        InputSchema::object(props, ["city".to_string()])
    }

    #[tokio::test]
    async fn normalized_string_match_scores_ten() {
        let score = score_parameters(
            &params(&[("city", json!("Paris"))]),
            &params(&[("city", json!("paris "))]),
            &InputSchema::Permissive,
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 10.0).abs() < f64::EPSILON);
        assert_eq!(score.justification, "Perfect parameter match");
    }

    #[tokio::test]
    async fn missing_expected_parameter_halves_score() {
        let score = score_parameters(
            &params(&[("city", json!("Paris")), ("date", json!("2024-01-01"))]),
            &params(&[("city", json!("Paris"))]),
            &city_date_schema(),
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 5.0).abs() < f64::EPSILON);
        assert!(score.justification.contains("Missing params: date"));
    }

    #[tokio::test]
    async fn hallucination_subtracts_configured_penalty() {
        let score = score_parameters(
            &params(&[("city", json!("Paris"))]),
            &params(&[("city", json!("Paris")), ("units", json!("metric"))]),
            &city_date_schema(),
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 8.0).abs() < f64::EPSILON);
        assert!(score.justification.contains("Hallucinated params: units"));
    }

    #[tokio::test]
    async fn type_mismatch_subtracts_configured_penalty() {
        let score = score_parameters(
            &params(&[("city", json!("Paris"))]),
            &params(&[("city", json!("Paris")), ("date", json!(20240101))]),
            &city_date_schema(),
            &ScoringConfig::default(),
            None,
        )
        .await;
        // date is in-schema but mistyped: 10 - 1 = 9
        assert!((score.score - 9.0).abs() < f64::EPSILON);
        assert!(score.justification.contains("Type mismatches: date"));
    }

    #[tokio::test]
    async fn score_floors_at_zero() {
        let actual = params(&[
            ("x1", json!(1)),
            ("x2", json!(1)),
            ("x3", json!(1)),
            ("x4", json!(1)),
            ("x5", json!(1)),
            ("x6", json!(1)),
        ]);
        let score = score_parameters(
            &BTreeMap::new(),
            &actual,
            &city_date_schema(),
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn no_parameters_expected_scores_ten() {
        let score = score_parameters(
            &BTreeMap::new(),
            &BTreeMap::new(),
            &InputSchema::Permissive,
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 10.0).abs() < f64::EPSILON);
        assert_eq!(score.justification, "No parameters expected, full score");
    }

    #[tokio::test]
    async fn numeric_tolerance_applies() {
        let score = score_parameters(
            &params(&[("lat", json!(48.8566))]),
            &params(&[("lat", json!(48.856_600_000_000_01))]),
            &InputSchema::Permissive,
            &ScoringConfig::default(),
            None,
        )
        .await;
        assert!((score.score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn boolean_string_coercion() {
        assert!(values_equivalent(&json!(true), &json!("Yes"), 1e-9));
        assert!(values_equivalent(&json!(false), &json!("no"), 1e-9));
        assert!(!values_equivalent(&json!(true), &json!("no"), 1e-9));
    }

    struct AlwaysYesJudge;

    #[async_trait::async_trait]
    impl LlmJudge for AlwaysYesJudge {
        async fn judge_equivalent(
            &self,
            _expected: &Value,
            _actual: &Value,
        ) -> Result<bool, crate::error::LlmError> {
            Ok(true)
        }
    }

    struct FailingJudge;

    #[async_trait::async_trait]
    impl LlmJudge for FailingJudge {
        async fn judge_equivalent(
            &self,
            _expected: &Value,
            _actual: &Value,
        ) -> Result<bool, crate::error::LlmError> {
            Err(crate::error::LlmError::Timeout {
                provider: "judge".to_string(),
                timeout_secs: 5,
            })
        }
    }

    #[tokio::test]
    async fn judge_rescues_semantic_equivalents() {
        let score = score_parameters(
            &params(&[("city", json!("NYC"))]),
            &params(&[("city", json!("New York City"))]),
            &InputSchema::Permissive,
            &ScoringConfig::default(),
            Some(&AlwaysYesJudge),
        )
        .await;
        assert!((score.score - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failing_judge_keeps_deterministic_result() {
        let score = score_parameters(
            &params(&[("city", json!("NYC"))]),
            &params(&[("city", json!("New York City"))]),
            &InputSchema::Permissive,
            &ScoringConfig::default(),
            Some(&FailingJudge),
        )
        .await;
        assert!((score.score - 0.0).abs() < f64::EPSILON);
        assert!(score.justification.contains("Incorrect values"));
    }
}
