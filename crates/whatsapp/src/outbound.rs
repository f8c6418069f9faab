//! Chunked, ordered outbound text delivery over the Graph API.

use std::time::Duration;

use {
    anyhow::{Context, Result},
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use zapgate_common::text::preview;

/// Split `text` into ordered fixed-width chunks of at most `max_chars`
/// characters. No word-boundary awareness: a hard cut keeps the dispatcher
/// trivially predictable, at the cost of occasionally splitting a word.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sends reply text to a recipient, chunk by chunk, in order.
///
/// Chunks go out sequentially so the client renders them in read order. A
/// failed chunk aborts everything after it; partial delivery is an accepted
/// outcome and retrying (if at all) is the caller's decision.
pub struct ReplyDispatcher {
    client: reqwest::Client,
    api_base: String,
    phone_number_id: String,
    access_token: Secret<String>,
    max_chunk_len: usize,
}

impl ReplyDispatcher {
    pub fn new(
        api_base: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: Secret<String>,
        max_chunk_len: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build outbound HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            phone_number_id: phone_number_id.into(),
            access_token,
            max_chunk_len,
        })
    }

    /// Send `text` to `to`. Returns the number of chunks delivered.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<usize> {
        let chunks = chunk_text(text, self.max_chunk_len);
        let total = chunks.len();
        info!(to, text_len = text.len(), chunk_count = total, "outbound send start");

        for (i, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.send_chunk(to, chunk).await {
                warn!(to, chunk = i + 1, total, error = %e, "chunk send failed, aborting remainder");
                return Err(e).with_context(|| format!("chunk {}/{total} to {to}", i + 1));
            }
            info!(
                to,
                chunk = i + 1,
                total,
                body = %preview(chunk, 80),
                "chunk sent"
            );
        }
        Ok(total)
    }

    async fn send_chunk(&self, to: &str, body: &str) -> Result<()> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await
            .context("outbound request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("graph api returned {status}: {}", preview(&detail, 200));
        }
        Ok(())
    }
}
