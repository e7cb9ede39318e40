//! Test case definitions for tool-selection evaluation.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// One tool call the test author expects the LLM to make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedToolCall {
    /// URL of the MCP server hosting the expected tool.
    pub server_url: String,
    /// Name of the expected tool.
    pub tool_name: String,
    /// Expected parameter values. Empty means "no parameters expected".
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    /// Position of this call when the test case is order-dependent.
    pub sequence_order: u32,
}

impl ExpectedToolCall {
    /// Creates an expected call with no parameters.
    #[must_use]
    pub fn new(
        server_url: impl Into<String>,
        tool_name: impl Into<String>,
        sequence_order: u32,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            tool_name: tool_name.into(),
            parameters: BTreeMap::new(),
            sequence_order,
        }
    }

    /// Adds an expected parameter value.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Matching key: calls pair up only when server and tool name agree.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (self.server_url.as_str(), self.tool_name.as_str())
    }
}

/// A tool-selection test case.
///
/// Owns an ordered list of zero or more expected calls; an empty list means
/// "no tool call expected" (the TN scenario).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Human-readable name of the test case.
    pub name: String,
    /// The natural-language query posed to the LLM.
    pub query: String,
    /// MCP servers whose tools are candidates for this case.
    pub available_mcp_servers: Vec<String>,
    /// Expected tool calls, in authoring order.
    #[serde(default)]
    pub expected_calls: Vec<ExpectedToolCall>,
    /// Whether matching must respect call order.
    #[serde(default)]
    pub order_dependent_matching: bool,
}

impl TestCase {
    /// Creates a test case with no expected calls.
    #[must_use]
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            available_mcp_servers: Vec::new(),
            expected_calls: Vec::new(),
            order_dependent_matching: false,
        }
    }

    /// Adds a candidate MCP server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.available_mcp_servers.push(url.into());
        self
    }

    /// Adds an expected call.
    #[must_use]
    pub fn expect_call(mut self, call: ExpectedToolCall) -> Self {
        self.expected_calls.push(call);
        self
    }

    /// Enables order-dependent matching.
    #[must_use]
    pub fn order_dependent(mut self) -> Self {
        self.order_dependent_matching = true;
        self
    }

    /// Validates the test case before any run starts.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyQuery`] if the query is blank.
    /// - [`ValidationError::NoServers`] if no server is named.
    /// - [`ValidationError::DuplicateSequenceOrder`] if the case is
    ///   order-dependent and two expected calls share a `sequence_order`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.available_mcp_servers.is_empty() {
            return Err(ValidationError::NoServers);
        }
        if self.order_dependent_matching {
            let mut seen = HashSet::new();
            for call in &self.expected_calls {
                if !seen.insert(call.sequence_order) {
                    return Err(ValidationError::DuplicateSequenceOrder {
                        sequence_order: call.sequence_order,
                        tool_name: call.tool_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
