//! Call matching: aligning expected tool calls against the LLM's trace.

use std::collections::HashMap;

use tracing::debug;

use crate::param_score::{score_parameters, ScoringConfig};
use crate::providers::LlmJudge;
use crate::run::{ActualToolCall, ToolCallMatch};
use crate::test_case::ExpectedToolCall;
use crate::tool_def::{InputSchema, ToolDefinition};

fn schema_for<'a>(
    tools: &'a [ToolDefinition],
    server_url: &str,
    tool_name: &str,
) -> Option<&'a InputSchema> {
    tools
        .iter()
        .find(|t| t.server_url == server_url && t.name == tool_name)
        .map(|t| &t.input_schema)
}

async fn true_positive_match(
    expected: &ExpectedToolCall,
    actual: &ActualToolCall,
    tools: &[ToolDefinition],
    config: &ScoringConfig,
    judge: Option<&dyn LlmJudge>,
) -> ToolCallMatch {
    // Scoring against a tool we never ingested falls back to permissive.
    let schema = schema_for(tools, &actual.server_url, &actual.tool_name)
        .cloned()
        .unwrap_or(InputSchema::Permissive);
    let score = score_parameters(
        &expected.parameters,
        &actual.extracted_parameters,
        &schema,
        config,
        judge,
    )
    .await;
    ToolCallMatch::true_positive(
        expected.clone(),
        actual.clone(),
        score.score,
        score.justification,
    )
}

/// Matches expected against actual calls as multisets keyed by
/// `(server_url, tool_name)`.
///
/// Each actual call greedily consumes the unconsumed expected call with the
/// same key that has the lowest `sequence_order`, which makes matching
/// deterministic and reproducible. Leftover expected calls become FN,
/// leftover actual calls become FP, and two empty lists yield a single TN.
/// Duplicates matter: two identical expected calls need two actual calls.
pub async fn match_unordered(
    expected: &[ExpectedToolCall],
    actual: &[ActualToolCall],
    tools: &[ToolDefinition],
    config: &ScoringConfig,
    judge: Option<&dyn LlmJudge>,
) -> Vec<ToolCallMatch> {
    if expected.is_empty() && actual.is_empty() {
        return vec![ToolCallMatch::true_negative()];
    }

    // Unconsumed expected indices per key, each kept sorted by sequence_order.
    let mut remaining: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (idx, call) in expected.iter().enumerate() {
        remaining.entry(call.key()).or_default().push(idx);
    }
    for indices in remaining.values_mut() {
        indices.sort_by_key(|&i| (expected[i].sequence_order, i));
    }

    let mut matches = Vec::new();
    let mut consumed = vec![false; expected.len()];
    let mut unmatched_actual: Vec<&ActualToolCall> = Vec::new();

    for act in actual {
        let paired = remaining
            .get_mut(&act.key())
            .and_then(|indices| (!indices.is_empty()).then(|| indices.remove(0)));
        match paired {
            Some(exp_idx) => {
                consumed[exp_idx] = true;
                matches.push(true_positive_match(&expected[exp_idx], act, tools, config, judge).await);
            }
            None => unmatched_actual.push(act),
        }
    }

    for (idx, exp) in expected.iter().enumerate() {
        if !consumed[idx] {
            matches.push(ToolCallMatch::false_negative(
                exp.clone(),
                "Expected tool not called by LLM",
            ));
        }
    }

    for act in unmatched_actual {
        matches.push(ToolCallMatch::false_positive(act.clone()));
    }

    debug!(
        expected = expected.len(),
        actual = actual.len(),
        matches = matches.len(),
        "unordered call matching complete"
    );
    matches
}

/// Matches expected against actual calls positionally.
///
/// Expected calls are sorted by `sequence_order` first. A position where the
/// keys differ never cross-matches; it yields one FN for the expected call
/// and one FP for the actual call. Length mismatches yield FN for missing
/// positions and FP for extra positions.
pub async fn match_ordered(
    expected: &[ExpectedToolCall],
    actual: &[ActualToolCall],
    tools: &[ToolDefinition],
    config: &ScoringConfig,
    judge: Option<&dyn LlmJudge>,
) -> Vec<ToolCallMatch> {
    if expected.is_empty() && actual.is_empty() {
        return vec![ToolCallMatch::true_negative()];
    }

    let mut ordered: Vec<&ExpectedToolCall> = expected.iter().collect();
    ordered.sort_by_key(|c| c.sequence_order);

    let mut matches = Vec::new();
    let positions = ordered.len().max(actual.len());
    for i in 0..positions {
        match (ordered.get(i), actual.get(i)) {
            (Some(exp), Some(act)) => {
                if exp.key() == act.key() {
                    matches.push(true_positive_match(exp, act, tools, config, judge).await);
                } else {
                    matches.push(ToolCallMatch::false_negative(
                        (*exp).clone(),
                        format!("Expected tool not called at position {i}"),
                    ));
                    matches.push(ToolCallMatch::false_positive(act.clone()));
                }
            }
            (Some(exp), None) => {
                matches.push(ToolCallMatch::false_negative(
                    (*exp).clone(),
                    format!("Expected tool not called at position {i}"),
                ));
            }
            (None, Some(act)) => {
                matches.push(ToolCallMatch::false_positive(act.clone()));
            }
            // Loop is bounded by the longer list.
            (None, None) => break,
        }
    }

    debug!(
        expected = expected.len(),
        actual = actual.len(),
        matches = matches.len(),
        "ordered call matching complete"
    );
    matches
}

/// Dispatches to ordered or unordered matching per the test case config.
pub async fn match_calls(
    expected: &[ExpectedToolCall],
    actual: &[ActualToolCall],
    tools: &[ToolDefinition],
    order_dependent: bool,
    config: &ScoringConfig,
    judge: Option<&dyn LlmJudge>,
) -> Vec<ToolCallMatch> {
    if order_dependent {
        match_ordered(expected, actual, tools, config, judge).await
    } else {
        match_unordered(expected, actual, tools, config, judge).await
    }
}
