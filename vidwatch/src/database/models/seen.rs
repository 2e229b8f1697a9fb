//! Seen-content ledger model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `seen_content` table: one per announced content id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SeenContentDbModel {
    pub content_id: String,
    /// Unix epoch milliseconds (UTC) of the first successful notification.
    pub seen_at: i64,
}
