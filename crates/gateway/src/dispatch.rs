//! Command → tool-call dispatch.
//!
//! Every arm ends in user-facing reply text. Tool transport failures for the
//! direct commands propagate as errors so the webhook handler can answer 500
//! and let the provider redeliver; the freeform pipeline handles its own
//! failures and never errors here.

use {
    anyhow::{Context, Result},
    tracing::{debug, info},
};

use {
    zapgate_commands::{AgenticRequest, Command, USAGE},
    zapgate_identity::{IdentityError, is_valid_tenant_id},
    zapgate_pipeline::{MSG_AUTH_REQUIRED, extract::deployment_url},
};

use crate::state::AppState;

pub async fn dispatch(state: &AppState, sender_id: &str, command: Command) -> Result<String> {
    match command {
        Command::Deploy { code } => deploy(state, &code).await,
        Command::AccessibilityCheck { urls } => accessibility_check(state, &urls).await,
        Command::Login => Ok(login_link(&state.public_base_url, sender_id)),
        Command::Agentic(req) => agentic(state, sender_id, req).await,
        Command::Help => Ok(USAGE.to_string()),
        Command::Freeform(prompt) => Ok(state.pipeline.run(&prompt, sender_id).await),
    }
}

async fn deploy(state: &AppState, code: &str) -> Result<String> {
    let output = state
        .tools
        .invoke("code_deploy", serde_json::json!({ "reactCode": code }))
        .await
        .context("code_deploy failed")?;

    Ok(match deployment_url(&output) {
        Some(url) => {
            info!(url = %url, "direct deploy complete");
            format!("Deployed: {url}")
        },
        None => output,
    })
}

async fn accessibility_check(state: &AppState, urls: &[String]) -> Result<String> {
    state
        .tools
        .invoke("accessibility_check", serde_json::json!({ "urls": urls }))
        .await
        .context("accessibility_check failed")
}

fn login_link(public_base_url: &str, sender_id: &str) -> String {
    format!(
        "Link your account here: {}/link?chat_id={sender_id}",
        public_base_url.trim_end_matches('/')
    )
}

async fn agentic(state: &AppState, sender_id: &str, req: AgenticRequest) -> Result<String> {
    // The inline hint wins when it is already a well-formed tenant id;
    // anything else goes through the linker.
    let tenant_id = if is_valid_tenant_id(&req.tenant_hint) {
        req.tenant_hint.clone()
    } else {
        debug!(hint = %req.tenant_hint, "tenant hint is not an id, resolving via linker");
        match state.identity.resolve_tenant_id(sender_id).await {
            Ok(id) => id,
            Err(IdentityError::AuthRequired) => return Ok(MSG_AUTH_REQUIRED.to_string()),
            Err(e) => return Err(e).context("tenant resolution failed"),
        }
    };

    let mut args = serde_json::json!({
        "prompt": req.prompt,
        "actionType": req.action.as_str(),
        "tenantId": tenant_id,
    });
    if let Some(file_name) = req.file_name {
        args["fileName"] = serde_json::Value::String(file_name);
    }
    if let Some(current_code) = req.current_code {
        args["currentCode"] = serde_json::Value::String(current_code);
    }

    state
        .tools
        .invoke("agentic_structured", args)
        .await
        .context("agentic_structured failed")
}
