//! Persistent MCP tool session: JSON-RPC 2.0 over the stdio of a child
//! process, connected once at startup and shared by all in-flight requests.
//!
//! Orchestration code depends on the [`ToolCaller`] trait rather than the
//! concrete session, so tests substitute an in-process stub.

mod error;
mod session;
mod transport;
mod types;

pub use {
    error::{ToolError, ToolErrorKind},
    session::{ToolCaller, ToolSession},
    transport::StdioTransport,
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION},
};
