//! Tool session: the MCP handshake plus the one call orchestration needs,
//! `invoke(name, args) -> text`.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tracing::{info, warn},
};

use {zapgate_common::text::preview, crate::error::{ToolError, ToolErrorKind}};

use crate::{
    transport::StdioTransport,
    types::{
        ClientInfo, InitializeParams, InitializeResult, PROTOCOL_VERSION, ToolsCallParams,
        ToolsCallResult,
    },
};

/// Default per-invocation deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability seam for remote tool invocation. Orchestration depends on
/// this trait; tests implement it with an in-process stub.
#[async_trait]
pub trait ToolCaller: Send + Sync {
    /// Invoke a named tool and return its text output.
    async fn invoke(&self, tool: &str, args: serde_json::Value) -> Result<String, ToolError>;
}

/// A live MCP session over one child process, shared by all in-flight
/// webhook tasks. Connected once at startup; never reconnected per call.
pub struct ToolSession {
    transport: Arc<StdioTransport>,
    call_timeout: Duration,
}

impl ToolSession {
    /// Spawn the server and complete the `initialize`/`initialized` handshake.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, ToolError> {
        let transport = StdioTransport::spawn(command, args, env)
            .await
            .map_err(|e| ToolError::new("initialize", ToolErrorKind::Transport(e.to_string())))?;

        let session = Self {
            transport,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        };
        session.initialize().await?;
        Ok(session)
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({}),
            client_info: ClientInfo {
                name: "zapgate".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };

        let wrap = |kind| ToolError::new("initialize", kind);
        let resp = self
            .transport
            .request(
                "initialize",
                Some(serde_json::to_value(&params).map_err(|e| wrap(e.into()))?),
                self.call_timeout,
            )
            .await
            .map_err(wrap)?;

        let result: InitializeResult = serde_json::from_value(
            resp.result
                .ok_or_else(|| wrap(ToolErrorKind::Transport("initialize returned no result".into())))?,
        )
        .map_err(|e| wrap(e.into()))?;

        info!(
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "tool server initialized"
        );

        self.transport
            .notify("notifications/initialized", None)
            .await
            .map_err(wrap)?;
        Ok(())
    }

    /// Whether the underlying server process is still running.
    pub async fn is_alive(&self) -> bool {
        self.transport.is_alive().await
    }

    /// Kill the server process.
    pub async fn shutdown(&self) {
        self.transport.kill().await;
    }
}

#[async_trait]
impl ToolCaller for ToolSession {
    async fn invoke(&self, tool: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let params = ToolsCallParams {
            name: tool.into(),
            arguments: args,
        };
        let wrap = |kind| ToolError::new(tool, kind);

        let resp = self
            .transport
            .request(
                "tools/call",
                Some(serde_json::to_value(&params).map_err(|e| wrap(e.into()))?),
                self.call_timeout,
            )
            .await
            .map_err(wrap)?;

        let result: ToolsCallResult = serde_json::from_value(
            resp.result
                .ok_or_else(|| wrap(ToolErrorKind::NoTextContent))?,
        )
        .map_err(|e| wrap(e.into()))?;

        match text_of(&result) {
            Ok(text) => {
                info!(tool, output = %preview(&text, 120), "tool call succeeded");
                Ok(text)
            },
            Err(kind) => {
                warn!(tool, error = %kind, "tool call failed");
                Err(wrap(kind))
            },
        }
    }
}

/// Reduce a `tools/call` result to its text payload: an `isError` result
/// becomes [`ToolErrorKind::ToolReported`] (carrying the text when there is
/// one), and a success without any text part is [`ToolErrorKind::NoTextContent`].
fn text_of(result: &ToolsCallResult) -> Result<String, ToolErrorKind> {
    let text = result.first_text();
    if result.is_error {
        return Err(ToolErrorKind::ToolReported(
            text.unwrap_or("no detail provided").to_string(),
        ));
    }
    text.map(String::from).ok_or(ToolErrorKind::NoTextContent)
}
