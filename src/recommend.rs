//! Differentiation issues and improvement recommendations for
//! overlapping tool pairs.
//!
//! Detection is rule-based and deterministic. An optional LLM text
//! generator can draft revised descriptions; if it is absent or fails,
//! the recommendation still carries the detected issues.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::overlap::OverlapEntry;
use crate::providers::LlmTextGenerator;
use crate::tfidf::TfIdfModel;
use crate::tool_def::ToolDefinition;

/// Words that signal a description states its scope.
const SCOPE_CUES: &[&str] = &[
    "for", "in", "from", "to", "with", "using", "within", "specific",
];

/// Markers that signal a description carries a usage example.
const EXAMPLE_MARKERS: &[&str] = &["e.g.", "for example", "such as"];

/// Kinds of differentiation problems a tool pair can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Neither description bounds what the tool applies to.
    ScopeClarity,
    /// Both descriptions lean on the same examples.
    ExampleDistinctiveness,
    /// The parameter surfaces are near-identical.
    ParameterUniqueness,
    /// The tool names are too similar to tell apart.
    NamingClarity,
    /// The descriptions share their most distinctive terms.
    TerminologyOverlap,
}

/// How urgently a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    /// The pair is likely to cause selection mistakes today.
    High,
    /// The pair is confusable but below the high-risk band.
    Medium,
}

/// One detected differentiation problem, with supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentiationIssue {
    /// What kind of problem this is.
    pub issue_type: IssueType,
    /// Composite id of the first tool.
    pub tool_a_id: String,
    /// Composite id of the second tool.
    pub tool_b_id: String,
    /// Human-readable statement of the problem.
    pub description: String,
    /// Machine-readable evidence backing the detection.
    pub evidence: Value,
    /// Urgency of this issue.
    pub priority: IssuePriority,
}

/// An LLM-drafted replacement description for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisedDescription {
    /// Composite id of the tool the revision applies to.
    pub tool_id: String,
    /// The drafted description text.
    pub revised: String,
}

/// The full recommendation for one overlapping pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Composite id of the first tool.
    pub tool_a_id: String,
    /// Composite id of the second tool.
    pub tool_b_id: String,
    /// The weighted overlap that triggered the recommendation.
    pub weighted_overlap: f64,
    /// Urgency of the recommendation as a whole.
    pub priority: IssuePriority,
    /// Detected issues; never empty for an over-threshold pair.
    pub issues: Vec<DifferentiationIssue>,
    /// Drafted replacement descriptions, when a generator was available
    /// and succeeded.
    pub revised_descriptions: Vec<RevisedDescription>,
    /// Shell-style commands a maintainer can run to apply the revisions.
    pub apply_commands: Vec<String>,
}

/// Thresholds driving issue detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Pairs at or above this weighted overlap get a recommendation.
    pub overlap_threshold: f64,
    /// Pairs at or above this weighted overlap are high priority.
    pub high_priority_threshold: f64,
    /// How many top TF-IDF terms to compare per description.
    pub top_terms: usize,
    /// Shared top terms at or above this count flag terminology overlap.
    pub shared_term_threshold: usize,
    /// Parameter-name Jaccard at or above this flags parameter uniqueness.
    pub parameter_jaccard_threshold: f64,
    /// Name-token Jaccard above this flags naming clarity.
    pub name_jaccard_threshold: f64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.6,
            high_priority_threshold: 0.8,
            top_terms: 5,
            shared_term_threshold: 2,
            parameter_jaccard_threshold: 0.5,
            name_jaccard_threshold: 0.5,
        }
    }
}

fn name_tokens(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn name_jaccard(a: &str, b: &str) -> f64 {
    let tokens_a = name_tokens(a);
    let tokens_b = name_tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    #[allow(clippy::cast_precision_loss)]
    let jaccard = intersection as f64 / union as f64;
    jaccard
}

fn has_scope_cue(description: &str) -> bool {
    description
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| SCOPE_CUES.contains(&word))
}

fn example_markers_in(description: &str) -> Vec<&'static str> {
    let lower = description.to_lowercase();
    EXAMPLE_MARKERS
        .iter()
        .copied()
        .filter(|marker| lower.contains(marker))
        .collect()
}

fn shared_parameter_names(a: &ToolDefinition, b: &ToolDefinition) -> Vec<String> {
    let names_a: BTreeSet<&str> = a.parameters().into_iter().map(|(n, _)| n).collect();
    let names_b: BTreeSet<&str> = b.parameters().into_iter().map(|(n, _)| n).collect();
    names_a
        .intersection(&names_b)
        .map(|n| (*n).to_string())
        .collect()
}

/// Detects differentiation issues for one over-threshold pair.
///
/// Always returns at least one issue: when no specific rule fires, the
/// pair still gets a `scope_clarity` issue, because an over-threshold
/// overlap with no identified cause is itself a scoping problem.
#[must_use]
pub fn detect_issues(
    tool_a: &ToolDefinition,
    tool_b: &ToolDefinition,
    entry: &OverlapEntry,
    terms_a: &[String],
    terms_b: &[String],
    config: &RecommendConfig,
) -> Vec<DifferentiationIssue> {
    let priority = if entry.weighted_overlap >= config.high_priority_threshold {
        IssuePriority::High
    } else {
        IssuePriority::Medium
    };
    let issue = |issue_type, description: String, evidence| DifferentiationIssue {
        issue_type,
        tool_a_id: entry.tool_a_id.clone(),
        tool_b_id: entry.tool_b_id.clone(),
        description,
        evidence,
        priority,
    };

    let mut issues = Vec::new();

    let set_a: BTreeSet<&String> = terms_a.iter().collect();
    let shared_terms: Vec<&str> = terms_b
        .iter()
        .filter(|t| set_a.contains(t))
        .map(String::as_str)
        .collect();
    if shared_terms.len() >= config.shared_term_threshold {
        issues.push(issue(
            IssueType::TerminologyOverlap,
            format!(
                "Descriptions share {} of their most distinctive terms",
                shared_terms.len()
            ),
            json!({ "overlapping_terms": shared_terms }),
        ));
    }

    if entry.parameter_overlap >= config.parameter_jaccard_threshold {
        issues.push(issue(
            IssueType::ParameterUniqueness,
            "Parameter surfaces are largely identical".to_string(),
            json!({
                "shared_parameters": shared_parameter_names(tool_a, tool_b),
                "parameter_jaccard": entry.parameter_overlap,
            }),
        ));
    }

    let name_similarity = name_jaccard(&tool_a.name, &tool_b.name);
    if name_similarity > config.name_jaccard_threshold {
        let tokens_a = name_tokens(&tool_a.name);
        let shared_tokens: Vec<String> = name_tokens(&tool_b.name)
            .into_iter()
            .filter(|t| tokens_a.contains(t))
            .collect();
        issues.push(issue(
            IssueType::NamingClarity,
            format!(
                "Tool names '{}' and '{}' are hard to tell apart",
                tool_a.name, tool_b.name
            ),
            json!({
                "name_jaccard": name_similarity,
                "shared_tokens": shared_tokens,
            }),
        ));
    }

    let markers_a = example_markers_in(&tool_a.description);
    let markers_b = example_markers_in(&tool_b.description);
    if !markers_a.is_empty() && !markers_b.is_empty() {
        issues.push(issue(
            IssueType::ExampleDistinctiveness,
            "Both descriptions carry examples without distinguishing the tools".to_string(),
            json!({ "markers_a": markers_a, "markers_b": markers_b }),
        ));
    }

    let scope_a = has_scope_cue(&tool_a.description);
    let scope_b = has_scope_cue(&tool_b.description);
    if !scope_a || !scope_b {
        let missing: Vec<&str> = [
            (!scope_a).then_some(entry.tool_a_id.as_str()),
            (!scope_b).then_some(entry.tool_b_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect();
        issues.push(issue(
            IssueType::ScopeClarity,
            "Description does not state what the tool applies to".to_string(),
            json!({ "tools_missing_scope": missing }),
        ));
    }

    if issues.is_empty() {
        issues.push(issue(
            IssueType::ScopeClarity,
            "Tools overlap heavily with no single identifiable cause".to_string(),
            json!({ "weighted_overlap": entry.weighted_overlap }),
        ));
    }
    issues
}

fn issue_summary(issues: &[DifferentiationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn apply_command(tool: &ToolDefinition, revised: &str) -> String {
    format!(
        "update-tool-description --server '{}' --tool '{}' --description '{}'",
        tool.server_url, tool.name, revised
    )
}

/// Generates recommendations for every over-threshold overlap entry.
///
/// Generator failures are logged and skipped; the recommendation is
/// emitted either way, so a flaky LLM never suppresses detected issues.
pub async fn generate_recommendations(
    tools: &[ToolDefinition],
    entries: &[OverlapEntry],
    config: &RecommendConfig,
    generator: Option<&dyn LlmTextGenerator>,
) -> Vec<Recommendation> {
    let by_id: HashMap<String, usize> = tools
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id(), i))
        .collect();
    let descriptions: Vec<String> = tools.iter().map(|t| t.description.clone()).collect();
    let tfidf = TfIdfModel::fit(&descriptions);

    let mut recommendations = Vec::new();
    for entry in entries {
        if entry.weighted_overlap < config.overlap_threshold {
            continue;
        }
        let (Some(&idx_a), Some(&idx_b)) = (by_id.get(&entry.tool_a_id), by_id.get(&entry.tool_b_id))
        else {
            debug!(
                tool_a = %entry.tool_a_id,
                tool_b = %entry.tool_b_id,
                "overlap entry references unknown tools, skipping"
            );
            continue;
        };
        let tool_a = &tools[idx_a];
        let tool_b = &tools[idx_b];

        let terms_a = tfidf.top_terms(idx_a, config.top_terms);
        let terms_b = tfidf.top_terms(idx_b, config.top_terms);
        let issues = detect_issues(tool_a, tool_b, entry, &terms_a, &terms_b, config);
        let priority = if entry.weighted_overlap >= config.high_priority_threshold {
            IssuePriority::High
        } else {
            IssuePriority::Medium
        };

        let mut revised_descriptions = Vec::new();
        let mut apply_commands = Vec::new();
        if let Some(generator) = generator {
            let summary = issue_summary(&issues);
            for tool in [tool_a, tool_b] {
                match generator.revise_description(tool, &summary).await {
                    Ok(revised) => {
                        apply_commands.push(apply_command(tool, &revised));
                        revised_descriptions.push(RevisedDescription {
                            tool_id: tool.id(),
                            revised,
                        });
                    }
                    Err(error) => {
                        warn!(tool = %tool.id(), %error, "description revision failed");
                    }
                }
            }
        }

        recommendations.push(Recommendation {
            tool_a_id: entry.tool_a_id.clone(),
            tool_b_id: entry.tool_b_id.clone(),
            weighted_overlap: entry.weighted_overlap,
            priority,
            issues,
            revised_descriptions,
            apply_commands,
        });
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition::new(name, description, "http://srv/sse")
    }

    fn entry(a: &ToolDefinition, b: &ToolDefinition, weighted: f64, params: f64) -> OverlapEntry {
        OverlapEntry {
            tool_a_id: a.id(),
            tool_b_id: b.id(),
            semantic: weighted,
            parameter_overlap: params,
            description_overlap: weighted,
            weighted_overlap: weighted,
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl LlmTextGenerator for FixedGenerator {
        async fn revise_description(
            &self,
            tool: &ToolDefinition,
            _issue_summary: &str,
        ) -> Result<String, LlmError> {
            Ok(format!("Revised: {}", tool.description))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl LlmTextGenerator for FailingGenerator {
        async fn revise_description(
            &self,
            _tool: &ToolDefinition,
            _issue_summary: &str,
        ) -> Result<String, LlmError> {
            Err(LlmError::Provider {
                provider: "stub".to_string(),
                message: "overloaded".to_string(),
            })
        }
    }

    #[test]
    fn similar_names_flag_naming_clarity() {
        let a = tool("search_web", "Search pages for a query");
        let b = tool("search_web_pages", "Search sites for a query");
        let issues = detect_issues(
            &a,
            &b,
            &entry(&a, &b, 0.9, 0.0),
            &[],
            &[],
            &RecommendConfig::default(),
        );
        assert!(
            issues
                .iter()
                .any(|i| i.issue_type == IssueType::NamingClarity)
        );
    }

    #[test]
    fn shared_distinctive_terms_flag_terminology() {
        let a = tool("a", "Query weather forecasts");
        let b = tool("b", "Query weather alerts");
        let terms_a = vec!["weather".to_string(), "forecasts".to_string()];
        let terms_b = vec!["weather".to_string(), "forecasts".to_string()];
        let issues = detect_issues(
            &a,
            &b,
            &entry(&a, &b, 0.7, 0.0),
            &terms_a,
            &terms_b,
            &RecommendConfig::default(),
        );
        let terminology = issues
            .iter()
            .find(|i| i.issue_type == IssueType::TerminologyOverlap)
            .unwrap();
        assert_eq!(terminology.priority, IssuePriority::Medium);
        assert_eq!(
            terminology.evidence["overlapping_terms"],
            serde_json::json!(["weather", "forecasts"])
        );
    }

    #[test]
    fn over_threshold_pair_never_issue_free() {
        // Scoped descriptions, distinct names, distinct terms and params.
        let a = tool("alpha", "Fetch metrics for dashboards");
        let b = tool("omega", "Render charts from samples");
        let issues = detect_issues(
            &a,
            &b,
            &entry(&a, &b, 0.9, 0.0),
            &["metrics".to_string()],
            &["charts".to_string()],
            &RecommendConfig::default(),
        );
        assert!(!issues.is_empty());
    }

    #[test]
    fn missing_scope_cue_flags_scope_clarity() {
        let a = tool("lookup", "Looks things up");
        let b = tool("resolve", "Resolves names for hosts");
        let issues = detect_issues(
            &a,
            &b,
            &entry(&a, &b, 0.7, 0.0),
            &[],
            &[],
            &RecommendConfig::default(),
        );
        let scope = issues
            .iter()
            .find(|i| i.issue_type == IssueType::ScopeClarity)
            .unwrap();
        assert_eq!(
            scope.evidence["tools_missing_scope"],
            serde_json::json!(["http://srv/sse:lookup"])
        );
    }

    #[test]
    fn shared_examples_flag_example_distinctiveness() {
        let a = tool("a", "Searches docs, e.g. manuals, for a query");
        let b = tool("b", "Searches wikis, for example intranets, for a query");
        let issues = detect_issues(
            &a,
            &b,
            &entry(&a, &b, 0.7, 0.0),
            &[],
            &[],
            &RecommendConfig::default(),
        );
        assert!(
            issues
                .iter()
                .any(|i| i.issue_type == IssueType::ExampleDistinctiveness)
        );
    }

    #[tokio::test]
    async fn under_threshold_pairs_skipped() {
        let a = tool("a", "Search for pages");
        let b = tool("b", "Send to addresses");
        let tools = vec![a.clone(), b.clone()];
        let entries = vec![entry(&a, &b, 0.2, 0.0)];
        let recs =
            generate_recommendations(&tools, &entries, &RecommendConfig::default(), None).await;
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn high_overlap_is_high_priority() {
        let a = tool("search_web", "Search the web for pages");
        let b = tool("search_net", "Search the net for pages");
        let tools = vec![a.clone(), b.clone()];
        let entries = vec![entry(&a, &b, 0.9, 1.0)];
        let recs =
            generate_recommendations(&tools, &entries, &RecommendConfig::default(), None).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, IssuePriority::High);
        assert!(!recs[0].issues.is_empty());
        assert!(recs[0].revised_descriptions.is_empty());
    }

    #[tokio::test]
    async fn generator_drafts_revisions_and_commands() {
        let a = tool("search_web", "Search the web for pages");
        let b = tool("search_net", "Search the net for pages");
        let tools = vec![a.clone(), b.clone()];
        let entries = vec![entry(&a, &b, 0.9, 1.0)];
        let recs = generate_recommendations(
            &tools,
            &entries,
            &RecommendConfig::default(),
            Some(&FixedGenerator),
        )
        .await;
        assert_eq!(recs[0].revised_descriptions.len(), 2);
        assert_eq!(recs[0].apply_commands.len(), 2);
        assert!(recs[0].apply_commands[0].contains("search_web"));
    }

    #[tokio::test]
    async fn generator_failure_degrades_to_issues_only() {
        let a = tool("search_web", "Search the web for pages");
        let b = tool("search_net", "Search the net for pages");
        let tools = vec![a.clone(), b.clone()];
        let entries = vec![entry(&a, &b, 0.9, 1.0)];
        let recs = generate_recommendations(
            &tools,
            &entries,
            &RecommendConfig::default(),
            Some(&FailingGenerator),
        )
        .await;
        assert_eq!(recs.len(), 1);
        assert!(recs[0].revised_descriptions.is_empty());
        assert!(!recs[0].issues.is_empty());
    }
}
