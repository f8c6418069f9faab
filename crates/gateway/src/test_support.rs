//! In-process stubs shared by the unit tests in this crate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {anyhow::Result, async_trait::async_trait};

use {
    zapgate_dedup::EventDeduplicator,
    zapgate_identity::{IdentityLinker, Principal, PrincipalStore},
    zapgate_mcp::{ToolCaller, ToolError, ToolErrorKind},
    zapgate_pipeline::GenerateAndDeployPipeline,
};

use crate::state::{AppState, ReplySink};

/// Scripted tool caller: answers by tool name, records every call.
#[derive(Default)]
pub struct StubTools {
    responses: Mutex<HashMap<String, Result<String, String>>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl StubTools {
    pub fn respond(&self, tool: &str, response: Result<&str, &str>) {
        self.responses.lock().unwrap().insert(
            tool.to_string(),
            response.map(str::to_string).map_err(str::to_string),
        );
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, serde_json::Value)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ToolCaller for StubTools {
    async fn invoke(&self, tool: &str, args: serde_json::Value) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push((tool.to_string(), args));
        match self.responses.lock().unwrap().get(tool) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(ToolError::new(tool, ToolErrorKind::Transport(e.clone()))),
            None => Err(ToolError::new(
                tool,
                ToolErrorKind::Transport("no scripted response".into()),
            )),
        }
    }
}

/// Records outbound replies instead of sending them.
#[derive(Default)]
pub struct StubReplies {
    sent: Mutex<Vec<(String, String)>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl StubReplies {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for StubReplies {
    async fn send_text(&self, to: &str, text: &str) -> Result<usize> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("simulated send failure");
        }
        self.sent.lock().unwrap().push((to.to_string(), text.to_string()));
        Ok(1)
    }
}

/// Principal store backed by a plain map.
#[derive(Default)]
pub struct MemPrincipals {
    map: Mutex<HashMap<String, Principal>>,
}

#[async_trait]
impl PrincipalStore for MemPrincipals {
    async fn upsert(&self, principal: &Principal) -> sqlx::Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(principal.external_chat_id.clone(), principal.clone());
        Ok(())
    }

    async fn get(&self, external_chat_id: &str) -> sqlx::Result<Option<Principal>> {
        Ok(self.map.lock().unwrap().get(external_chat_id).cloned())
    }
}

pub fn state_with(
    tools: Arc<StubTools>,
    replies: Arc<StubReplies>,
    default_tenant: Option<&str>,
) -> AppState {
    let identity = Arc::new(IdentityLinker::new(
        Arc::new(MemPrincipals::default()),
        None,
        default_tenant.map(String::from),
    ));
    let tools: Arc<dyn ToolCaller> = tools;
    AppState {
        dedup: Arc::new(EventDeduplicator::new(None, Duration::from_secs(600))),
        identity: Arc::clone(&identity),
        tools: Arc::clone(&tools),
        pipeline: Arc::new(GenerateAndDeployPipeline::new(tools, identity)),
        replies,
        verify_token: "verify-me".into(),
        app_secret: None,
        public_base_url: "http://gate.test".into(),
    }
}
