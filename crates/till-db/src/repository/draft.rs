//! # Draft Repository
//!
//! Last-write-wins key/value store of JSON blobs. The register parks its
//! cart, open table sessions and cashier ledger here so a restart mid-shift
//! picks up where it left off.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for draft blobs.
#[derive(Debug, Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Creates a new DraftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DraftRepository { pool }
    }

    /// Stores a blob, replacing any previous value.
    pub async fn save(&self, key: &str, payload: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO drafts (key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = payload.len(), "Draft saved");
        Ok(())
    }

    /// Loads a blob.
    pub async fn load(&self, key: &str) -> DbResult<Option<String>> {
        let payload: Option<String> = sqlx::query_scalar("SELECT payload FROM drafts WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payload)
    }

    /// Deletes a blob; no-op when absent.
    pub async fn delete(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM drafts WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Serializes `value` and stores it under `key`.
    pub async fn save_json<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let payload = serde_json::to_string(value)?;
        self.save(key, &payload).await
    }

    /// Loads and deserializes the blob under `key`.
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.load(key).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
