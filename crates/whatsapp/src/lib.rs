//! WhatsApp Cloud API channel: webhook envelope types, handshake and
//! signature verification, and the chunked outbound reply dispatcher.

mod outbound;
mod types;
mod webhook;

pub use {
    outbound::{ReplyDispatcher, chunk_text},
    types::{
        InboundEvent, WebhookChange, WebhookEntry, WebhookMessage, WebhookPayload, WebhookText,
        WebhookValue,
    },
    webhook::{extract_events, verify_signature, verify_subscription},
};
