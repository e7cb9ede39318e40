//! Test run types: the LLM trace, per-call matches, and the run itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::test_case::ExpectedToolCall;

/// LLM-reported confidence for a tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// The LLM reported high confidence.
    High,
    /// The LLM reported low confidence.
    Low,
}

/// One element of the LLM's tool-invocation trace for a run.
///
/// Produced fresh per run; never persisted independently of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualToolCall {
    /// URL of the server the LLM targeted.
    pub server_url: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Parameters the LLM extracted for the call.
    #[serde(default)]
    pub extracted_parameters: BTreeMap<String, Value>,
    /// Optional per-call confidence signal.
    #[serde(default)]
    pub confidence: Option<ConfidenceLevel>,
}

impl ActualToolCall {
    /// Creates an actual call with no parameters.
    #[must_use]
    pub fn new(server_url: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            tool_name: tool_name.into(),
            extracted_parameters: BTreeMap::new(),
            confidence: None,
        }
    }

    /// Adds an extracted parameter value.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extracted_parameters.insert(name.into(), value);
        self
    }

    /// Matching key: calls pair up only when server and tool name agree.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (self.server_url.as_str(), self.tool_name.as_str())
    }
}

/// Kind of one tool-call match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Expected call matched by an actual call.
    #[serde(rename = "TP")]
    TruePositive,
    /// Actual call with no matching expected call.
    #[serde(rename = "FP")]
    FalsePositive,
    /// Expected call never matched.
    #[serde(rename = "FN")]
    FalseNegative,
    /// No calls expected, none made.
    #[serde(rename = "TN")]
    TrueNegative,
}

/// Run-level classification, derived from the match list.
///
/// Same four-way vocabulary as [`MatchType`], applied to the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// The run selected exactly the expected tools.
    #[serde(rename = "TP")]
    TruePositive,
    /// The run made at least one spurious call (and missed nothing).
    #[serde(rename = "FP")]
    FalsePositive,
    /// The run missed at least one expected call.
    #[serde(rename = "FN")]
    FalseNegative,
    /// Nothing expected, nothing called.
    #[serde(rename = "TN")]
    TrueNegative,
}

/// Confidence category derived from LLM confidence crossed with correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceCategory {
    /// High confidence and correct: the tool descriptions are clear.
    Robust,
    /// Low confidence (or low-confidence failure): descriptions work but
    /// could be clearer.
    NeedsClarity,
    /// High confidence and wrong: the descriptions actively mislead.
    Misleading,
}

/// Lifecycle state of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not yet started.
    Pending,
    /// Tool ingestion / LLM call in progress.
    Running,
    /// Classification computed.
    Completed,
    /// Terminal failure; `error_message` is set, classification is not.
    Failed,
}

/// The atomic evaluation unit: one matched (or unmatched) tool call.
///
/// Invariants: FN matches have no actual call; FP matches have no expected
/// call; TN has neither; TP has both. `parameter_correctness` is present
/// only for TP matches. Created by the call matcher, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallMatch {
    /// Match kind.
    pub match_type: MatchType,
    /// The expected call this match refers to, if any.
    pub expected_call: Option<ExpectedToolCall>,
    /// The actual call this match refers to, if any.
    pub actual_call: Option<ActualToolCall>,
    /// Parameter correctness in [0, 10]; present only for TP matches. A TP
    /// against a tool with no ingested schema is scored against a
    /// permissive schema, so it still carries a score.
    pub parameter_correctness: Option<f64>,
    /// Human-readable explanation of which penalties applied.
    #[serde(default)]
    pub parameter_justification: Option<String>,
}

impl ToolCallMatch {
    /// Builds the single TN match for an empty run.
    #[must_use]
    pub fn true_negative() -> Self {
        Self {
            match_type: MatchType::TrueNegative,
            expected_call: None,
            actual_call: None,
            parameter_correctness: None,
            parameter_justification: None,
        }
    }

    /// Builds an FN match for an expected call that was never made.
    #[must_use]
    pub fn false_negative(expected: ExpectedToolCall, justification: impl Into<String>) -> Self {
        Self {
            match_type: MatchType::FalseNegative,
            expected_call: Some(expected),
            actual_call: None,
            parameter_correctness: None,
            parameter_justification: Some(justification.into()),
        }
    }

    /// Builds an FP match for a spurious actual call.
    #[must_use]
    pub fn false_positive(actual: ActualToolCall) -> Self {
        Self {
            match_type: MatchType::FalsePositive,
            expected_call: None,
            actual_call: Some(actual),
            parameter_correctness: None,
            parameter_justification: None,
        }
    }

    /// Builds a TP match with its parameter score.
    #[must_use]
    pub fn true_positive(
        expected: ExpectedToolCall,
        actual: ActualToolCall,
        correctness: f64,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            match_type: MatchType::TruePositive,
            expected_call: Some(expected),
            actual_call: Some(actual),
            parameter_correctness: Some(correctness),
            parameter_justification: Some(justification.into()),
        }
    }
}

/// One evaluation execution of a test case.
///
/// Owned exclusively by one test-case execution; never reused. Consumers
/// must check `status == Completed` before reading `classification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    /// Name of the test case this run executed.
    pub test_case_name: String,
    /// Per-call matches produced by the matcher.
    pub matches: Vec<ToolCallMatch>,
    /// Run-level classification; set only when completed.
    pub classification: Option<Classification>,
    /// Confidence the LLM reported for the run.
    pub llm_confidence: Option<ConfidenceLevel>,
    /// Mean of TP `parameter_correctness` values; `None` without TP matches.
    pub avg_parameter_correctness: Option<f64>,
    /// Derived confidence category; set only when completed.
    pub confidence_category: Option<ConfidenceCategory>,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Error message for failed runs.
    pub error_message: Option<String>,
    /// Raw LLM response, kept for debugging.
    pub raw_response: Option<String>,
    /// Wall-clock duration of the run in milliseconds.
    pub execution_time_ms: Option<u64>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl TestRun {
    /// Creates a pending run for a test case.
    #[must_use]
    pub fn pending(test_case_name: impl Into<String>) -> Self {
        Self {
            test_case_name: test_case_name.into(),
            matches: Vec::new(),
            classification: None,
            llm_confidence: None,
            avg_parameter_correctness: None,
            confidence_category: None,
            status: RunStatus::Pending,
            error_message: None,
            raw_response: None,
            execution_time_ms: None,
            started_at: Utc::now(),
        }
    }
}
