use std::time::Duration;

/// Failure of a single tool invocation, carrying the tool name for logs
/// and upstream error messages.
#[derive(Debug, thiserror::Error)]
#[error("tool '{tool}': {kind}")]
pub struct ToolError {
    pub tool: String,
    #[source]
    pub kind: ToolErrorKind,
}

impl ToolError {
    #[must_use]
    pub fn new(tool: impl Into<String>, kind: ToolErrorKind) -> Self {
        Self {
            tool: tool.into(),
            kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolErrorKind {
    /// The transport failed to deliver the request or response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No response arrived within the per-call deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The server process has exited; the session will not recover.
    #[error("tool session is closed")]
    SessionClosed,

    /// The server answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The tool ran but reported failure (`isError: true`).
    #[error("tool reported an error: {0}")]
    ToolReported(String),

    /// The response carried no text-typed content part.
    #[error("response contained no text content")]
    NoTextContent,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
