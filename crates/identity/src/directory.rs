use std::time::Duration;

use {async_trait::async_trait, serde::Deserialize, tracing::debug};

/// External directory resolving an email address to a tenant id.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// `Ok(None)` means the email is unknown to the directory.
    async fn tenant_for_email(&self, email: &str) -> reqwest::Result<Option<String>>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryResponse {
    tenant_id: Option<String>,
}

/// HTTP directory client: `GET <base_url>?email=<email>` returning
/// `{"tenantId": "..."}`.
pub struct HttpTenantDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTenantDirectory {
    pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TenantDirectory for HttpTenantDirectory {
    async fn tenant_for_email(&self, email: &str) -> reqwest::Result<Option<String>> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("email", email)])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(email, "tenant directory has no entry");
            return Ok(None);
        }

        let body: DirectoryResponse = resp.error_for_status()?.json().await?;
        Ok(body.tenant_id)
    }
}
