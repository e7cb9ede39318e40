//! Evaluation core for LLM tool selection over MCP tool corpora.
//!
//! This crate provides two analyses:
//!
//! 1. **Tool-selection evaluation**: runs natural-language test cases
//!    against an LLM, matches its tool-call trace against expectations,
//!    scores parameter correctness, and classifies each run (TP/FP/FN/TN)
//!    before aggregating precision/recall/F1.
//!
//! 2. **Corpus differentiation analysis**: measures how confusable the
//!    tools in a corpus are (embedding similarity, parameter overlap,
//!    description TF-IDF overlap) and recommends how to differentiate the
//!    offenders.
//!
//! All external collaborators (MCP servers, LLM providers, embedding
//! backends) arrive through traits, so the core is deterministic and
//! testable offline.
//!
//! # Quick Start
//!
//! ## Evaluating tool selection
//!
//! ```rust
//! use mcp_tool_eval::{
//!     ActualToolCall, Classification, Evaluator, ExpectedToolCall, ModelSettings,
//!     RunStatus, ScriptedToolCaller, StaticToolSource, TestCase, ToolDefinition,
//!     aggregate_metrics,
//! };
//!
//! let server = "http://localhost:9000/sse";
//! let source = StaticToolSource::new().with_server(
//!     server,
//!     vec![ToolDefinition::new("search", "Search the web for pages", server)],
//! );
//! let caller = ScriptedToolCaller::new(vec![ActualToolCall::new(server, "search")]);
//!
//! let case = TestCase::new("search-case", "find pages about rust")
//!     .server(server)
//!     .expect_call(ExpectedToolCall::new(server, "search", 0));
//!
//! let evaluator = Evaluator::new(&source, &caller, ModelSettings::new("stub", "stub-model"));
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let run = runtime.block_on(evaluator.run_case(&case)).unwrap();
//!
//! assert_eq!(run.status, RunStatus::Completed);
//! assert_eq!(run.classification, Some(Classification::TruePositive));
//!
//! let summary = aggregate_metrics([&run]);
//! assert_eq!(summary.true_positives, 1);
//! ```
//!
//! ## Analyzing corpus similarity
//!
//! ```rust
//! use mcp_tool_eval::{
//!     InMemoryEmbeddingCache, SimilarityOptions, StubEmbeddingProvider, ToolAnalyzer,
//!     ToolDefinition,
//! };
//!
//! let tools = vec![
//!     ToolDefinition::new("search_web", "Search the web for pages", "http://a/sse"),
//!     ToolDefinition::new("search_docs", "Search internal docs for pages", "http://b/sse"),
//! ];
//! let provider = StubEmbeddingProvider::new(32);
//! let cache = InMemoryEmbeddingCache::new();
//! let analyzer = ToolAnalyzer::new(&provider, &cache);
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let report = runtime
//!     .block_on(analyzer.analyze_similarity(&tools, &SimilarityOptions::default()))
//!     .unwrap();
//!
//! assert_eq!(report.scores.len(), 1);
//! assert_eq!(report.matrix.len(), 2);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod classify;
pub mod error;
pub mod evaluate;
pub mod matcher;
pub mod metrics;
pub mod overlap;
pub mod param_score;
pub mod providers;
pub mod recommend;
pub mod run;
pub mod schema_match;
pub mod similarity;
pub mod stubs;
pub mod test_case;
pub mod tfidf;
pub mod tool_def;

// Re-exports
pub use analysis::{
    OverlapReport, RecommendationReport, ReportMeta, SimilarityReport, ToolAnalyzer,
};
pub use classify::{MatchCounts, avg_parameter_correctness, classify, confidence_category};
pub use error::{ConnectivityError, EvalError, LlmError, ValidationError};
pub use evaluate::Evaluator;
pub use matcher::{match_calls, match_ordered, match_unordered};
pub use metrics::{ConfidenceDistribution, MetricsSummary, aggregate_metrics};
pub use overlap::{OverlapEntry, OverlapWeights, compute_overlap, parameter_jaccard};
pub use param_score::{ParameterScore, ScoringConfig, score_parameters, values_equivalent};
pub use providers::{
    EmbeddingCache, EmbeddingProvider, InMemoryEmbeddingCache, LlmJudge, LlmSelection,
    LlmTextGenerator, LlmToolCaller, ModelSettings, NoopEmbeddingCache, ToolSource, Transport,
};
pub use recommend::{
    DifferentiationIssue, IssuePriority, IssueType, Recommendation, RecommendConfig,
    RevisedDescription, detect_issues, generate_recommendations,
};
pub use run::{
    ActualToolCall, Classification, ConfidenceCategory, ConfidenceLevel, MatchType, RunStatus,
    TestRun, ToolCallMatch,
};
pub use schema_match::{SchemaReport, TypeMismatch, check_schema};
pub use similarity::{
    SimilarityEngine, SimilarityOptions, SimilarityScore, cosine_similarity, embedding_text,
    matrix_from_embeddings, scores_from_embeddings,
};
pub use stubs::{ScriptedToolCaller, StaticToolSource, StubEmbeddingProvider};
pub use test_case::{ExpectedToolCall, TestCase};
pub use tfidf::TfIdfModel;
pub use tool_def::{InputSchema, PropertySchema, SchemaType, ToolDefinition};
