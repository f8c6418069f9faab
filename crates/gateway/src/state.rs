use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    zapgate_dedup::EventDeduplicator,
    zapgate_identity::IdentityLinker,
    zapgate_mcp::ToolCaller,
    zapgate_pipeline::GenerateAndDeployPipeline,
    zapgate_whatsapp::ReplyDispatcher,
};

/// Outbound reply seam. Production uses the Graph API dispatcher; tests
/// substitute an in-process recorder.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<usize>;
}

#[async_trait]
impl ReplySink for ReplyDispatcher {
    async fn send_text(&self, to: &str, text: &str) -> Result<usize> {
        ReplyDispatcher::send_text(self, to, text).await
    }
}

/// Everything a webhook request needs, shared behind one `Arc`.
pub struct AppState {
    pub dedup: Arc<EventDeduplicator>,
    pub identity: Arc<IdentityLinker>,
    pub tools: Arc<dyn ToolCaller>,
    pub pipeline: Arc<GenerateAndDeployPipeline>,
    pub replies: Arc<dyn ReplySink>,
    /// Shared secret echoed back during the subscription handshake.
    pub verify_token: String,
    /// When set, inbound POST bodies must carry a valid
    /// `X-Hub-Signature-256` header.
    pub app_secret: Option<String>,
    /// Base URL login links are built from.
    pub public_base_url: String,
}
