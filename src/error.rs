//! Custom error types for the evaluation core.

use std::fmt;

/// Top-level error type for the evaluation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A tool source could not be reached.
    Connectivity(ConnectivityError),
    /// The LLM provider failed or timed out.
    Llm(LlmError),
    /// A test case or analysis request was malformed.
    Validation(ValidationError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity(e) => write!(f, "connectivity error: {e}"),
            Self::Llm(e) => write!(f, "LLM error: {e}"),
            Self::Validation(e) => write!(f, "validation error: {e}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Error reaching a tool source (MCP server).
///
/// Always fatal for the run that triggered the fetch: evaluating against a
/// partial tool set would make classification meaningless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    /// The server could not be reached at all.
    Unreachable {
        /// URL of the server.
        server_url: String,
        /// Underlying error message.
        message: String,
    },
    /// The server responded but tool listing failed.
    ListToolsFailed {
        /// URL of the server.
        server_url: String,
        /// Underlying error message.
        message: String,
    },
}

impl ConnectivityError {
    /// Returns the URL of the server that failed.
    #[must_use]
    pub fn server_url(&self) -> &str {
        match self {
            Self::Unreachable { server_url, .. } | Self::ListToolsFailed { server_url, .. } => {
                server_url
            }
        }
    }
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable {
                server_url,
                message,
            } => {
                write!(f, "server '{server_url}' unreachable: {message}")
            }
            Self::ListToolsFailed {
                server_url,
                message,
            } => {
                write!(f, "listing tools on '{server_url}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for ConnectivityError {}

/// Error from an LLM provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider returned an error response.
    Provider {
        /// Provider name (e.g. "openai").
        provider: String,
        /// Error message from the provider.
        message: String,
    },
    /// The call exceeded its timeout.
    Timeout {
        /// Provider name.
        provider: String,
        /// Timeout in seconds.
        timeout_secs: u64,
    },
    /// The provider response could not be parsed into tool calls.
    MalformedResponse {
        /// Description of what failed to parse.
        message: String,
    },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { provider, message } => {
                write!(f, "provider '{provider}' failed: {message}")
            }
            Self::Timeout {
                provider,
                timeout_secs,
            } => {
                write!(f, "provider '{provider}' timed out after {timeout_secs}s")
            }
            Self::MalformedResponse { message } => {
                write!(f, "malformed LLM response: {message}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Error in a test case or analysis request, detected before any run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An order-dependent test case repeats a sequence order.
    DuplicateSequenceOrder {
        /// The repeated sequence order.
        sequence_order: u32,
        /// Tool name of one of the offending calls.
        tool_name: String,
    },
    /// A test case names no MCP server to ingest tools from.
    NoServers,
    /// The test case query is empty.
    EmptyQuery,
    /// Similarity analysis needs at least two tools.
    TooFewTools {
        /// Number of tools actually available.
        tool_count: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSequenceOrder {
                sequence_order,
                tool_name,
            } => {
                write!(
                    f,
                    "duplicate sequence_order {sequence_order} in order-dependent test case \
                     (tool '{tool_name}')"
                )
            }
            Self::NoServers => write!(f, "test case names no MCP servers"),
            Self::EmptyQuery => write!(f, "test case query is empty"),
            Self::TooFewTools { tool_count } => {
                write!(
                    f,
                    "at least 2 tools required for similarity analysis, got {tool_count}"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ConnectivityError> for EvalError {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<LlmError> for EvalError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}

impl From<ValidationError> for EvalError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}
