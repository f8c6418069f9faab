use {async_trait::async_trait, sqlx::SqlitePool};

/// Durable keyed store for processed-event records.
///
/// `insert_once` must be atomic: under concurrent duplicate deliveries of the
/// same id, exactly one caller sees `Ok(true)`. This trait is the seam where
/// a shared/distributed store plugs in; the bundled implementation is SQLite.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Attempt a unique-constrained insert of `event_id`.
    ///
    /// `Ok(true)` — inserted, first delivery. `Ok(false)` — uniqueness
    /// violation, duplicate. `Err` — store unavailable or any other failure.
    async fn insert_once(&self, event_id: &str, first_seen_at: i64) -> sqlx::Result<bool>;
}

/// SQLite-backed dedup store. Records are append-only.
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the processed-events table schema.
    pub async fn init(pool: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS processed_events (
                id            TEXT    PRIMARY KEY,
                first_seen_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn insert_once(&self, event_id: &str, first_seen_at: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("INSERT INTO processed_events (id, first_seen_at) VALUES (?, ?)")
            .bind(event_id)
            .bind(first_seen_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
