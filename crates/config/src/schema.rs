//! Config schema. Every section has defaults so a partial file loads.

use std::collections::HashMap;

use {
    secrecy::Secret,
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZapgateConfig {
    pub server: ServerConfig,
    pub whatsapp: WhatsAppConfig,
    pub mcp: McpConfig,
    pub identity: IdentityConfig,
    pub dedup: DedupConfig,
}

/// HTTP server bind address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// WhatsApp Cloud API channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API.
    pub access_token: Secret<String>,
    /// Numeric id of the business phone number (the outbound sender).
    pub phone_number_id: String,
    /// Shared secret echoed during the webhook verification handshake.
    pub verify_token: String,
    /// App secret for `X-Hub-Signature-256` verification. When unset,
    /// inbound payload signatures are not checked.
    pub app_secret: Option<String>,
    /// Graph API base URL. Overridable for tests.
    pub api_base: String,
    /// Maximum characters per outbound message chunk.
    pub max_chunk_len: usize,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: Secret::new(String::new()),
            phone_number_id: String::new(),
            verify_token: String::new(),
            app_secret: None,
            api_base: "https://graph.facebook.com/v21.0".into(),
            max_chunk_len: 3500,
        }
    }
}

/// Launch parameters for the MCP tool-server process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Per-invocation deadline, seconds.
    pub call_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            call_timeout_secs: 30,
        }
    }
}

/// Identity linking and tenant attribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Tenant id used when no principal (or no directory match) exists.
    /// Must be a UUID to be usable.
    pub default_tenant_id: Option<String>,
    /// Tenant directory endpoint, queried by email.
    pub directory_url: Option<String>,
    /// Public base URL used to build login links.
    pub public_base_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_tenant_id: None,
            directory_url: None,
            public_base_url: "http://localhost:8080".into(),
        }
    }
}

/// Idempotency gate settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// SQLite database URL for the durable gate. When unset, only the
    /// in-memory fallback is used (single-instance guarantee only).
    pub database_url: Option<String>,
    /// TTL for the in-memory fallback, seconds.
    pub ttl_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            ttl_secs: 600,
        }
    }
}
