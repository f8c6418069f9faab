use {async_trait::async_trait, sqlx::SqlitePool};

use crate::Principal;

/// Keyed storage for linked principals.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Insert or replace the principal for its chat id (last-write-wins).
    async fn upsert(&self, principal: &Principal) -> sqlx::Result<()>;
    async fn get(&self, external_chat_id: &str) -> sqlx::Result<Option<Principal>>;
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    external_chat_id: String,
    provider_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl From<PrincipalRow> for Principal {
    fn from(r: PrincipalRow) -> Self {
        Self {
            external_chat_id: r.external_chat_id,
            provider_id: r.provider_id,
            email: r.email,
            display_name: r.display_name,
        }
    }
}

/// SQLite-backed principal store.
pub struct SqlitePrincipalStore {
    pool: SqlitePool,
}

impl SqlitePrincipalStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the principals table schema.
    pub async fn init(pool: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS principals (
                external_chat_id TEXT    PRIMARY KEY,
                provider_id      TEXT    NOT NULL,
                email            TEXT,
                display_name     TEXT,
                linked_at        INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for SqlitePrincipalStore {
    async fn upsert(&self, principal: &Principal) -> sqlx::Result<()> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        sqlx::query(
            r#"INSERT INTO principals (external_chat_id, provider_id, email, display_name, linked_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(external_chat_id) DO UPDATE SET
                 provider_id = excluded.provider_id,
                 email = excluded.email,
                 display_name = excluded.display_name,
                 linked_at = excluded.linked_at"#,
        )
        .bind(&principal.external_chat_id)
        .bind(&principal.provider_id)
        .bind(&principal.email)
        .bind(&principal.display_name)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, external_chat_id: &str) -> sqlx::Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "SELECT external_chat_id, provider_id, email, display_name
             FROM principals WHERE external_chat_id = ?",
        )
        .bind(external_chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqlitePrincipalStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqlitePrincipalStore::init(&pool).await.unwrap();
        SqlitePrincipalStore::new(pool)
    }

    fn principal(chat_id: &str, email: Option<&str>) -> Principal {
        Principal {
            external_chat_id: chat_id.into(),
            provider_id: "google".into(),
            email: email.map(String::from),
            display_name: Some("Alex".into()),
        }
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let store = test_store().await;
        let p = principal("5511999990000", Some("alex@example.com"));
        store.upsert(&p).await.unwrap();
        assert_eq!(store.get("5511999990000").await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn relink_is_last_write_wins() {
        let store = test_store().await;
        store
            .upsert(&principal("551100", Some("old@example.com")))
            .await
            .unwrap();
        store
            .upsert(&principal("551100", Some("new@example.com")))
            .await
            .unwrap();

        let got = store.get("551100").await.unwrap().unwrap();
        assert_eq!(got.email.as_deref(), Some("new@example.com"));
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = test_store().await;
        assert_eq!(store.get("nobody").await.unwrap(), None);
    }
}
