//! Inbound webhook envelope, as delivered by the WhatsApp Cloud API.
//!
//! Only the fields this gateway consumes are modeled; everything else in the
//! provider payload is ignored by serde.

use serde::Deserialize;

/// One logical inbound message, flattened out of the webhook envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Provider message id (`wamid....`). May be redelivered; natural key
    /// for the idempotency gate.
    pub external_event_id: String,
    /// Sender's WhatsApp id (phone-derived).
    pub sender_id: String,
    pub text: String,
    /// Provider timestamp, unix seconds.
    pub received_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    /// Delivery-status callbacks. Acknowledged, never acted on.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<WebhookText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookText {
    #[serde(default)]
    pub body: String,
}

impl WebhookMessage {
    /// Text body for `text`-typed messages, if non-empty.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        if self.message_type != "text" {
            return None;
        }
        self.text
            .as_ref()
            .map(|t| t.body.as_str())
            .filter(|b| !b.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_envelope() {
        let raw = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "10001",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"phone_number_id": "555"},
                        "messages": [{
                            "from": "5511999990000",
                            "id": "wamid.1",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": "/help"}
                        }]
                    }
                }]
            }]
        }"#;
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        let msg = &payload.entry[0].changes[0].value.messages[0];
        assert_eq!(msg.id, "wamid.1");
        assert_eq!(msg.text_body(), Some("/help"));
    }

    #[test]
    fn status_only_payload_parses_with_no_messages() {
        let raw = r#"{"entry":[{"changes":[{"field":"messages","value":{"statuses":[{"status":"delivered"}]}}]}]}"#;
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        let value = &payload.entry[0].changes[0].value;
        assert!(value.messages.is_empty());
        assert_eq!(value.statuses.len(), 1);
    }

    #[test]
    fn non_text_message_has_no_body() {
        let raw = r#"{"id":"wamid.2","from":"551","type":"image"}"#;
        let msg: WebhookMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.text_body(), None);
    }
}
