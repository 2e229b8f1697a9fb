//! SQLite-backed ledger.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DedupLedger;
use crate::Result;
use crate::database::models::SeenContentDbModel;
use crate::database::time::now_ms;

/// Ledger stored in the `seen_content` table.
#[derive(Clone)]
pub struct SqlxDedupLedger {
    pool: SqlitePool,
}

impl SqlxDedupLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the stored record for `content_id`, if any.
    pub async fn get_record(&self, content_id: &str) -> Result<Option<SeenContentDbModel>> {
        let record = sqlx::query_as::<_, SeenContentDbModel>(
            "SELECT content_id, seen_at FROM seen_content WHERE content_id = ?",
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[async_trait]
impl DedupLedger for SqlxDedupLedger {
    async fn has_seen(&self, content_id: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM seen_content WHERE content_id = ? LIMIT 1")
                .bind(content_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn mark_seen(&self, content_id: &str) -> Result<()> {
        // First writer wins; later calls keep the original seen_at.
        sqlx::query(
            "INSERT INTO seen_content (content_id, seen_at) VALUES (?, ?) ON CONFLICT(content_id) DO NOTHING",
        )
        .bind(content_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
