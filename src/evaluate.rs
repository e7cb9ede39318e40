//! Run orchestration: ingest tools, call the LLM, match, classify.

use std::time::Instant;

use futures::future;
use tracing::{info, warn};

use crate::classify::{avg_parameter_correctness, classify, confidence_category};
use crate::error::{EvalError, ValidationError};
use crate::matcher::match_calls;
use crate::param_score::ScoringConfig;
use crate::providers::{LlmJudge, LlmSelection, LlmToolCaller, ModelSettings, ToolSource, Transport};
use crate::run::{RunStatus, TestRun, ToolCallMatch};
use crate::test_case::TestCase;
use crate::tool_def::ToolDefinition;

/// Orchestrates test-case runs against injected collaborators.
///
/// Holds no cross-run state: tool definitions are fetched fresh for every
/// run and each run owns its `TestRun` exclusively.
pub struct Evaluator<'a> {
    tool_source: &'a dyn ToolSource,
    tool_caller: &'a dyn LlmToolCaller,
    judge: Option<&'a dyn LlmJudge>,
    settings: ModelSettings,
    transport: Transport,
    scoring: ScoringConfig,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator over a tool source and an LLM caller.
    #[must_use]
    pub fn new(
        tool_source: &'a dyn ToolSource,
        tool_caller: &'a dyn LlmToolCaller,
        settings: ModelSettings,
    ) -> Self {
        Self {
            tool_source,
            tool_caller,
            judge: None,
            settings,
            transport: Transport::Sse,
            scoring: ScoringConfig::default(),
        }
    }

    /// Sets the transport used for tool ingestion.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Attaches an optional semantic judge for parameter scoring.
    #[must_use]
    pub fn judge(mut self, judge: &'a dyn LlmJudge) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Overrides the parameter scoring configuration.
    #[must_use]
    pub fn scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Fetches tool definitions from every server concurrently.
    ///
    /// Fail-fast: the first server failure aborts the whole ingestion, since
    /// evaluating against a partial tool set would skew classification.
    async fn ingest_tools(&self, case: &TestCase) -> Result<Vec<ToolDefinition>, EvalError> {
        let fetches = case
            .available_mcp_servers
            .iter()
            .map(|url| self.tool_source.fetch_tools(url, self.transport));
        let tool_sets = future::try_join_all(fetches).await?;
        Ok(tool_sets.into_iter().flatten().collect())
    }

    async fn execute(
        &self,
        case: &TestCase,
    ) -> Result<(Vec<ToolCallMatch>, LlmSelection), EvalError> {
        let tools = self.ingest_tools(case).await?;
        info!(
            case = %case.name,
            servers = case.available_mcp_servers.len(),
            tools = tools.len(),
            "tools ingested"
        );
        let selection = self
            .tool_caller
            .select_tools(&case.query, &tools, &self.settings)
            .await?;
        let matches = match_calls(
            &case.expected_calls,
            &selection.tool_calls,
            &tools,
            case.order_dependent_matching,
            &self.scoring,
            self.judge,
        )
        .await;
        Ok((matches, selection))
    }

    /// Runs a single test case to a terminal `TestRun`.
    ///
    /// Collaborator failures (connectivity, LLM) yield a `Failed` run with
    /// `error_message` set and no classification. Only a malformed test case
    /// is an error here, detected before anything runs.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the test case itself is invalid.
    pub async fn run_case(&self, case: &TestCase) -> Result<TestRun, ValidationError> {
        case.validate()?;

        let mut run = TestRun::pending(&case.name);
        run.status = RunStatus::Running;
        let started = Instant::now();

        match self.execute(case).await {
            Ok((matches, selection)) => {
                let classification = classify(&matches);
                run.classification = Some(classification);
                run.confidence_category = selection
                    .confidence
                    .map(|c| confidence_category(c, classification));
                run.avg_parameter_correctness = avg_parameter_correctness(&matches);
                run.llm_confidence = selection.confidence;
                run.raw_response = Some(selection.raw_response);
                run.matches = matches;
                run.status = RunStatus::Completed;
            }
            Err(error) => {
                warn!(case = %case.name, %error, "run failed");
                run.error_message = Some(error.to_string());
                run.status = RunStatus::Failed;
            }
        }
        run.execution_time_ms = Some(elapsed_ms(&started));
        Ok(run)
    }

    /// Runs a slice of test cases sequentially.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered; runs before it are
    /// discarded, so suites should be validated up front.
    pub async fn run_suite(&self, cases: &[TestCase]) -> Result<Vec<TestRun>, ValidationError> {
        for case in cases {
            case.validate()?;
        }
        let mut runs = Vec::with_capacity(cases.len());
        for case in cases {
            runs.push(self.run_case(case).await?);
        }
        Ok(runs)
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
