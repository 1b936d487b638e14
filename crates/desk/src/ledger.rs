//! Duplicate-delivery ledger.
//!
//! A recorded (conversation id, source tag) pair means the message was
//! already forwarded. The ledger is advisory and fails open: when the
//! store is unreachable the bridge prefers delivering twice over not
//! delivering at all.

use {
    async_trait::async_trait,
    sqlx::SqlitePool,
    tracing::warn,
};

/// Dedup marker embedded in desk messages, `WAID:<message-id>`.
pub fn source_tag(message_id: &str) -> String {
    format!("WAID:{message_id}")
}

/// Persisted record of forwarded messages.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Advisory point lookup. Invalid conversation ids (<= 0) and store
    /// errors both answer `false`.
    async fn already_delivered(&self, conversation_id: i64, tag: &str) -> bool;

    /// Atomically record the pair unless present; returns `true` when the
    /// caller owns the delivery (the insert landed, or the store failed
    /// open). Run immediately before the desk send so a concurrent
    /// duplicate loses the insert race instead of racing a read.
    async fn record_if_new(&self, conversation_id: i64, tag: &str) -> bool;
}

/// SQLite-backed ledger.
pub struct SqliteDeliveryLedger {
    pool: SqlitePool,
}

impl SqliteDeliveryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the ledger schema. Used at startup and by tests with
    /// in-memory databases.
    pub async fn init(pool: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS delivery_ledger (
                conversation_id INTEGER NOT NULL,
                source_tag      TEXT    NOT NULL,
                created_at      INTEGER NOT NULL,
                UNIQUE (conversation_id, source_tag)
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

#[async_trait]
impl DeliveryLedger for SqliteDeliveryLedger {
    async fn already_delivered(&self, conversation_id: i64, tag: &str) -> bool {
        if conversation_id <= 0 {
            return false;
        }
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM delivery_ledger WHERE conversation_id = ? AND source_tag = ?",
        )
        .bind(conversation_id)
        .bind(tag)
        .fetch_optional(&self.pool)
        .await;
        match found {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!(conversation_id, tag, error = %e, "ledger lookup failed, failing open");
                false
            },
        }
    }

    async fn record_if_new(&self, conversation_id: i64, tag: &str) -> bool {
        if conversation_id <= 0 {
            return true;
        }
        let result = sqlx::query(
            "INSERT OR IGNORE INTO delivery_ledger (conversation_id, source_tag, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(tag)
        .bind(Self::now())
        .execute(&self.pool)
        .await;
        match result {
            Ok(done) => done.rows_affected() > 0,
            Err(e) => {
                warn!(conversation_id, tag, error = %e, "ledger insert failed, failing open");
                true
            },
        }
    }
}
