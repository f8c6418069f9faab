//! Webhook verification and envelope flattening.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::{debug, warn},
};

use crate::types::{InboundEvent, WebhookPayload};

type HmacSha256 = Hmac<Sha256>;

/// Verify the subscription handshake (GET request).
///
/// The provider sends `hub.mode=subscribe`, `hub.verify_token=<secret>` and
/// `hub.challenge=<nonce>`; the challenge is echoed back iff the mode and
/// token match.
#[must_use]
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    let (mode, token, challenge) = (mode?, token?, challenge?);
    (mode == "subscribe" && !verify_token.is_empty() && token == verify_token)
        .then(|| challenge.to_string())
}

/// Verify the `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw
/// request body.
#[must_use]
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        warn!("signature header missing sha256= prefix");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        warn!("failed to build HMAC from app secret");
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(&computed, expected)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Flatten a webhook envelope into the text message events it carries.
/// Status-only callbacks and non-text messages are skipped (and logged).
#[must_use]
pub fn extract_events(payload: &WebhookPayload) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                debug!(field = %change.field, "ignoring non-message webhook change");
                continue;
            }
            if change.value.messages.is_empty() && !change.value.statuses.is_empty() {
                debug!(count = change.value.statuses.len(), "status-only callback, acknowledged");
            }
            for msg in &change.value.messages {
                let Some(text) = msg.text_body() else {
                    debug!(msg_type = %msg.message_type, id = %msg.id, "ignoring non-text message");
                    continue;
                };
                events.push(InboundEvent {
                    external_event_id: msg.id.clone(),
                    sender_id: msg.from.clone(),
                    text: text.to_string(),
                    received_at: msg
                        .timestamp
                        .as_deref()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or_else(now_unix),
                });
            }
        }
    }
    events
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_echoes_challenge_on_match() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("ch123"), "tok"),
            Some("ch123".to_string())
        );
    }

    #[test]
    fn subscription_rejects_bad_token_or_mode() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("wrong"), Some("ch"), "tok"),
            None
        );
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("tok"), Some("ch"), "tok"),
            None
        );
        assert_eq!(verify_subscription(None, Some("tok"), Some("ch"), "tok"), None);
    }

    #[test]
    fn subscription_rejects_when_no_token_configured() {
        // An empty configured token must never verify, even if echoed.
        assert_eq!(
            verify_subscription(Some("subscribe"), Some(""), Some("ch"), ""),
            None
        );
    }

    #[test]
    fn signature_roundtrip() {
        let body = b"payload bytes";
        let secret = "app_secret";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let header = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_signature(body, &header, secret));
        assert!(!verify_signature(b"tampered", &header, secret));
        assert!(!verify_signature(body, "sha256=00ff", secret));
        assert!(!verify_signature(body, "not-a-signature", secret));
    }

    #[test]
    fn extract_skips_statuses_and_non_text() {
        let raw = r#"{"entry":[{"changes":[
            {"field":"messages","value":{"statuses":[{"status":"read"}]}},
            {"field":"messages","value":{"messages":[
                {"id":"wamid.img","from":"551","type":"image"},
                {"id":"wamid.1","from":"5511999990000","timestamp":"1700000000","type":"text","text":{"body":"hi"}}
            ]}},
            {"field":"account_update","value":{}}
        ]}]}"#;
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        let events = extract_events(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].external_event_id, "wamid.1");
        assert_eq!(events[0].sender_id, "5511999990000");
        assert_eq!(events[0].text, "hi");
        assert_eq!(events[0].received_at, 1_700_000_000);
    }
}
