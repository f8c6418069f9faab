use std::sync::Arc;

use {
    tracing::{debug, info, warn},
    uuid::Uuid,
};

use crate::{Principal, directory::TenantDirectory, store::PrincipalStore};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No usable tenant id could be attributed to the chat id. Surfaced to
    /// the user as an authenticate-first message, never as a raw error.
    #[error("authentication required")]
    AuthRequired,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Maps external chat ids to principals and attributes a tenant id to them.
pub struct IdentityLinker {
    store: Arc<dyn PrincipalStore>,
    directory: Option<Arc<dyn TenantDirectory>>,
    default_tenant_id: Option<String>,
}

impl IdentityLinker {
    #[must_use]
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        directory: Option<Arc<dyn TenantDirectory>>,
        default_tenant_id: Option<String>,
    ) -> Self {
        Self {
            store,
            directory,
            default_tenant_id,
        }
    }

    /// Upsert the principal for its chat id. Only the out-of-band link
    /// callback calls this; last write wins.
    pub async fn link(&self, principal: &Principal) -> Result<(), IdentityError> {
        self.store.upsert(principal).await?;
        info!(
            chat_id = %principal.external_chat_id,
            provider = %principal.provider_id,
            "linked principal"
        );
        Ok(())
    }

    pub async fn resolve(&self, external_chat_id: &str) -> Result<Option<Principal>, IdentityError> {
        Ok(self.store.get(external_chat_id).await?)
    }

    /// Attribute a tenant id to a chat id.
    ///
    /// Source order: directory lookup by the linked principal's email, then
    /// the configured default. Every candidate must be a well-formed UUID;
    /// an id that fails the check is treated as "no identity" and the next
    /// source is tried. Directory and store failures are logged and
    /// non-fatal. When nothing valid remains: [`IdentityError::AuthRequired`].
    pub async fn resolve_tenant_id(&self, external_chat_id: &str) -> Result<String, IdentityError> {
        let principal = match self.store.get(external_chat_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(chat_id = external_chat_id, error = %e, "principal store lookup failed");
                None
            },
        };

        if let Some(tenant_id) = self.tenant_from_directory(principal.as_ref()).await {
            if is_valid_tenant_id(&tenant_id) {
                debug!(chat_id = external_chat_id, tenant_id, "tenant resolved via directory");
                return Ok(tenant_id);
            }
            warn!(
                chat_id = external_chat_id,
                tenant_id, "directory returned malformed tenant id, ignoring"
            );
        }

        match self.default_tenant_id {
            Some(ref tenant_id) if is_valid_tenant_id(tenant_id) => {
                debug!(chat_id = external_chat_id, tenant_id, "tenant resolved via default");
                Ok(tenant_id.clone())
            },
            Some(ref tenant_id) => {
                warn!(tenant_id, "configured default tenant id is malformed");
                Err(IdentityError::AuthRequired)
            },
            None => Err(IdentityError::AuthRequired),
        }
    }

    async fn tenant_from_directory(&self, principal: Option<&Principal>) -> Option<String> {
        let directory = self.directory.as_ref()?;
        let principal = principal?;
        let email = principal.email.as_deref()?;

        match directory.tenant_for_email(email).await {
            Ok(tenant) => tenant,
            Err(e) => {
                warn!(
                    chat_id = %principal.external_chat_id,
                    error = %e,
                    "tenant directory lookup failed"
                );
                None
            },
        }
    }
}

/// Tenant ids must be UUID-shaped before they are attached to tool calls.
pub fn is_valid_tenant_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, async_trait::async_trait, std::collections::HashMap, std::sync::Mutex};

    const TENANT_A: &str = "3f6c2c3a-6f10-4d8e-9a93-7b22d2b1a111";
    const TENANT_DEFAULT: &str = "9d6a7b1e-0c3f-4a2d-8e5b-1f2a3b4c5d6e";

    struct MemStore(Mutex<HashMap<String, Principal>>);

    impl MemStore {
        fn empty() -> Arc<Self> {
            Arc::new(Self(Mutex::new(HashMap::new())))
        }

        fn with(principal: Principal) -> Arc<Self> {
            let mut m = HashMap::new();
            m.insert(principal.external_chat_id.clone(), principal);
            Arc::new(Self(Mutex::new(m)))
        }
    }

    #[async_trait]
    impl PrincipalStore for MemStore {
        async fn upsert(&self, p: &Principal) -> sqlx::Result<()> {
            self.0
                .lock()
                .unwrap()
                .insert(p.external_chat_id.clone(), p.clone());
            Ok(())
        }

        async fn get(&self, id: &str) -> sqlx::Result<Option<Principal>> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }
    }

    struct FixedDirectory(Option<String>);

    #[async_trait]
    impl TenantDirectory for FixedDirectory {
        async fn tenant_for_email(&self, _email: &str) -> reqwest::Result<Option<String>> {
            Ok(self.0.clone())
        }
    }

    fn linked_principal() -> Principal {
        Principal {
            external_chat_id: "5511999990000".into(),
            provider_id: "google".into(),
            email: Some("a@example.com".into()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn directory_hit_wins() {
        let linker = IdentityLinker::new(
            MemStore::with(linked_principal()),
            Some(Arc::new(FixedDirectory(Some(TENANT_A.into())))),
            Some(TENANT_DEFAULT.into()),
        );
        assert_eq!(
            linker.resolve_tenant_id("5511999990000").await.unwrap(),
            TENANT_A
        );
    }

    #[tokio::test]
    async fn unlinked_chat_falls_back_to_default() {
        let linker = IdentityLinker::new(
            MemStore::empty(),
            Some(Arc::new(FixedDirectory(Some(TENANT_A.into())))),
            Some(TENANT_DEFAULT.into()),
        );
        assert_eq!(
            linker.resolve_tenant_id("unknown").await.unwrap(),
            TENANT_DEFAULT
        );
    }

    #[tokio::test]
    async fn malformed_directory_id_falls_back_to_default() {
        let linker = IdentityLinker::new(
            MemStore::with(linked_principal()),
            Some(Arc::new(FixedDirectory(Some("dev-user".into())))),
            Some(TENANT_DEFAULT.into()),
        );
        assert_eq!(
            linker.resolve_tenant_id("5511999990000").await.unwrap(),
            TENANT_DEFAULT
        );
    }

    #[tokio::test]
    async fn malformed_ids_everywhere_require_auth() {
        let linker = IdentityLinker::new(
            MemStore::with(linked_principal()),
            Some(Arc::new(FixedDirectory(Some("dev-user".into())))),
            Some("also-not-a-uuid".into()),
        );
        assert!(matches!(
            linker.resolve_tenant_id("5511999990000").await,
            Err(IdentityError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn no_sources_require_auth() {
        let linker = IdentityLinker::new(MemStore::empty(), None, None);
        assert!(matches!(
            linker.resolve_tenant_id("anyone").await,
            Err(IdentityError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn link_then_resolve() {
        let linker = IdentityLinker::new(MemStore::empty(), None, None);
        linker.link(&linked_principal()).await.unwrap();
        let got = linker.resolve("5511999990000").await.unwrap().unwrap();
        assert_eq!(got.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn uuid_shape_check() {
        assert!(is_valid_tenant_id(TENANT_A));
        assert!(!is_valid_tenant_id("dev-user"));
        assert!(!is_valid_tenant_id(""));
    }
}
