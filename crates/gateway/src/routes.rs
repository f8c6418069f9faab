//! Webhook and identity-link routes.

use std::{collections::HashMap, sync::Arc};

use {
    axum::{
        Json,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    tracing::{debug, error, info, warn},
};

use {
    zapgate_identity::Principal,
    zapgate_whatsapp::{
        InboundEvent, WebhookPayload, extract_events, verify_signature, verify_subscription,
    },
};

use crate::{dispatch::dispatch, state::AppState};

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET webhook: subscription handshake. Echoes the challenge on a token
/// match, 403 otherwise.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let echo = verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        &state.verify_token,
    );
    match echo {
        Some(challenge) => {
            info!("webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        },
        None => {
            warn!("webhook subscription verification failed");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

/// POST webhook: inbound events. Each message runs the full
/// receive → dedup → parse → dispatch → reply sequence; status-only
/// callbacks are acknowledged with 200 and no action.
pub async fn receive_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(ref app_secret) = state.app_secret {
        let header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, header, app_secret) {
            warn!("rejected webhook body with bad or missing signature");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unparseable webhook body");
            return StatusCode::BAD_REQUEST.into_response();
        },
    };

    // Spawned so a client that disconnects early cannot cancel processing
    // mid-event; the reply channel is independent of this response.
    let task = tokio::spawn(async move {
        for event in extract_events(&payload) {
            if let Err(stage) = handle_event(&state, &event).await {
                error!(
                    event_id = %event.external_event_id,
                    sender = %event.sender_id,
                    stage,
                    "event handling failed, answering 500 for redelivery"
                );
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        StatusCode::OK
    });

    match task.await {
        Ok(status) => status.into_response(),
        Err(e) => {
            error!(error = %e, "webhook processing task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Drive one inbound event through its lifecycle. Returns the failed stage
/// name on error; duplicates are a success (dropped, no reply).
async fn handle_event(state: &AppState, event: &InboundEvent) -> Result<(), &'static str> {
    let event_id = event.external_event_id.as_str();
    info!(event_id, sender = %event.sender_id, "event received");

    if !state.dedup.admit_once(event_id).await {
        info!(event_id, "duplicate event dropped");
        return Ok(());
    }

    let command = zapgate_commands::parse(&event.text);
    debug!(event_id, command = ?command_name(&command), "event parsed");

    let reply = match dispatch(state, &event.sender_id, command).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(event_id, error = %e, "dispatch failed");
            return Err("routed");
        },
    };

    match state.replies.send_text(&event.sender_id, &reply).await {
        Ok(chunks) => {
            info!(event_id, chunks, "event replied");
            Ok(())
        },
        Err(e) => {
            error!(event_id, error = %e, "reply delivery failed");
            Err("replied")
        },
    }
}

fn command_name(command: &zapgate_commands::Command) -> &'static str {
    use zapgate_commands::Command::*;
    match command {
        Deploy { .. } => "deploy",
        AccessibilityCheck { .. } => "access",
        Login => "login",
        Agentic(_) => "agentic",
        Help => "help",
        Freeform(_) => "freeform",
    }
}

/// POST identity-link callback, invoked by the out-of-band OAuth completion.
pub async fn link_handler(
    State(state): State<Arc<AppState>>,
    Json(principal): Json<Principal>,
) -> Response {
    match state.identity.link(&principal).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(chat_id = %principal.external_chat_id, error = %e, "identity link failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::test_support::{StubReplies, StubTools, state_with};

    use super::*;

    fn event(id: &str, text: &str) -> InboundEvent {
        InboundEvent {
            external_event_id: id.to_string(),
            sender_id: "5511999990000".to_string(),
            text: text.to_string(),
            received_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn duplicate_event_is_dropped_without_reply() {
        let replies = Arc::new(StubReplies::default());
        let state = state_with(Arc::new(StubTools::default()), Arc::clone(&replies), None);

        handle_event(&state, &event("wamid.1", "/help")).await.unwrap();
        handle_event(&state, &event("wamid.1", "/help")).await.unwrap();

        assert_eq!(replies.sent().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_failure_reports_routed_stage() {
        let tools = Arc::new(StubTools::default());
        tools.respond("code_deploy", Err("pipe closed"));
        let state = state_with(tools, Arc::new(StubReplies::default()), None);

        let err = handle_event(&state, &event("wamid.2", "/deploy someCode")).await;
        assert_eq!(err, Err("routed"));
    }

    #[tokio::test]
    async fn send_failure_reports_replied_stage() {
        let replies = Arc::new(StubReplies::default());
        replies.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let state = state_with(Arc::new(StubTools::default()), replies, None);

        let err = handle_event(&state, &event("wamid.3", "/help")).await;
        assert_eq!(err, Err("replied"));
    }
}
