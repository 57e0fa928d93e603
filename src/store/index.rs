//! Persistent message index
//!
//! Keyed metadata store for admitted messages, durable across restarts.
//! The index never references a blob that was not written first; the
//! message store enforces that ordering.

use crate::envelope::{MessageKind, RecipientType};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::StoredMessage;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// Seam over the persistent message index.
#[async_trait]
pub trait MessageIndex: Send + Sync {
    async fn insert(&self, record: &StoredMessage) -> StoreResult<()>;

    /// Delete by id; returns whether a record existed.
    async fn delete(&self, message_id: &str) -> StoreResult<bool>;

    async fn get(&self, message_id: &str) -> StoreResult<Option<StoredMessage>>;

    /// All records for a (recipient type, kind) pair.
    async fn query(
        &self,
        recipient_type: RecipientType,
        kind: MessageKind,
    ) -> StoreResult<Vec<StoredMessage>>;

    /// Records whose expiry lies before `cutoff`.
    async fn expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<StoredMessage>>;

    /// Sum of stored record sizes.
    async fn used_bytes(&self) -> StoreResult<u64>;
}

/// SQLite-backed message index.
pub struct SqliteMessageIndex {
    pool: SqlitePool,
}

impl SqliteMessageIndex {
    /// Open (or create) an index at the given database URL.
    pub async fn new(db_url: &str) -> StoreResult<Self> {
        let pool = SqlitePool::connect(db_url).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory index for tests. Pinned to a single connection so every
    /// query sees the same database.
    pub async fn new_in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                recipient_address TEXT NOT NULL,
                recipient_type TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                blob_location TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_route ON messages(recipient_type, kind)",
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_expiry ON messages(expires_at)")
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StoreResult<StoredMessage> {
        let kind_str: String = row.try_get("kind")?;
        let kind = MessageKind::from_str_opt(&kind_str)
            .ok_or_else(|| StoreError::Index(format!("unknown kind column value {kind_str}")))?;

        let type_str: String = row.try_get("recipient_type")?;
        let recipient_type = RecipientType::from_str_opt(&type_str).ok_or_else(|| {
            StoreError::Index(format!("unknown recipient type column value {type_str}"))
        })?;

        Ok(StoredMessage {
            message_id: row.try_get("message_id")?,
            kind,
            recipient_address: row.try_get("recipient_address")?,
            recipient_type,
            sender_id: row.try_get("sender_id")?,
            created_at: timestamp_column(row.try_get("created_at")?)?,
            expires_at: timestamp_column(row.try_get("expires_at")?)?,
            size_bytes: row.try_get::<i64, _>("size_bytes")? as u64,
            blob_location: row.try_get("blob_location")?,
        })
    }
}

fn timestamp_column(secs: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StoreError::Index(format!("timestamp column {secs} out of range")))
}

#[async_trait]
impl MessageIndex for SqliteMessageIndex {
    async fn insert(&self, record: &StoredMessage) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO messages
            (message_id, kind, recipient_address, recipient_type, sender_id,
             created_at, expires_at, size_bytes, blob_location)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.message_id)
        .bind(record.kind.as_str())
        .bind(&record.recipient_address)
        .bind(record.recipient_type.as_str())
        .bind(&record.sender_id)
        .bind(record.created_at.timestamp())
        .bind(record.expires_at.timestamp())
        .bind(record.size_bytes as i64)
        .bind(&record.blob_location)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, message_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE message_id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, message_id: &str) -> StoreResult<Option<StoredMessage>> {
        let row = sqlx::query("SELECT * FROM messages WHERE message_id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_record(&r)).transpose()
    }

    async fn query(
        &self,
        recipient_type: RecipientType,
        kind: MessageKind,
    ) -> StoreResult<Vec<StoredMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE recipient_type = ? AND kind = ? ORDER BY created_at",
        )
        .bind(recipient_type.as_str())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<StoredMessage>> {
        let rows = sqlx::query("SELECT * FROM messages WHERE expires_at < ?")
            .bind(cutoff.timestamp())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn used_bytes(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COALESCE(SUM(size_bytes), 0) as total FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("total")? as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, recipient_type: RecipientType, kind: MessageKind) -> StoredMessage {
        let now = Utc::now();
        StoredMessage {
            message_id: id.to_string(),
            kind,
            recipient_address: "relay.example.com".into(),
            recipient_type,
            sender_id: "sender-1".into(),
            created_at: timestamp_column(now.timestamp()).unwrap(),
            expires_at: timestamp_column(now.timestamp() + 3600).unwrap(),
            size_bytes: 128,
            blob_location: format!("{id}.blob"),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let index = SqliteMessageIndex::new_in_memory().await.unwrap();
        let rec = record("m-1", RecipientType::Internet, MessageKind::Cargo);

        index.insert(&rec).await.unwrap();
        let loaded = index.get("m-1").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn test_query_by_type_and_kind() {
        let index = SqliteMessageIndex::new_in_memory().await.unwrap();

        index
            .insert(&record(
                "cca-1",
                RecipientType::Internet,
                MessageKind::CollectionAuthorization,
            ))
            .await
            .unwrap();
        index
            .insert(&record("cargo-1", RecipientType::Internet, MessageKind::Cargo))
            .await
            .unwrap();
        index
            .insert(&record(
                "local-1",
                RecipientType::LocalNetwork,
                MessageKind::Cargo,
            ))
            .await
            .unwrap();

        let ccas = index
            .query(RecipientType::Internet, MessageKind::CollectionAuthorization)
            .await
            .unwrap();
        assert_eq!(ccas.len(), 1);
        assert_eq!(ccas[0].message_id, "cca-1");

        let local = index
            .query(RecipientType::LocalNetwork, MessageKind::Cargo)
            .await
            .unwrap();
        assert_eq!(local.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let index = SqliteMessageIndex::new_in_memory().await.unwrap();
        let rec = record("m-1", RecipientType::Internet, MessageKind::Cargo);

        index.insert(&rec).await.unwrap();
        assert!(index.delete("m-1").await.unwrap());
        assert!(!index.delete("m-1").await.unwrap());
        assert!(index.get("m-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_used_bytes() {
        let index = SqliteMessageIndex::new_in_memory().await.unwrap();
        assert_eq!(index.used_bytes().await.unwrap(), 0);

        index
            .insert(&record("m-1", RecipientType::Internet, MessageKind::Cargo))
            .await
            .unwrap();
        index
            .insert(&record("m-2", RecipientType::Internet, MessageKind::Cargo))
            .await
            .unwrap();

        assert_eq!(index.used_bytes().await.unwrap(), 256);
    }

    #[tokio::test]
    async fn test_expired_before() {
        let index = SqliteMessageIndex::new_in_memory().await.unwrap();
        let mut old = record("m-old", RecipientType::Internet, MessageKind::Cargo);
        old.expires_at = Utc::now() - chrono::Duration::hours(1);

        index.insert(&old).await.unwrap();
        index
            .insert(&record("m-new", RecipientType::Internet, MessageKind::Cargo))
            .await
            .unwrap();

        let expired = index.expired_before(Utc::now()).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].message_id, "m-old");
    }
}
