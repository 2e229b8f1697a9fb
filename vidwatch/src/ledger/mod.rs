//! Seen-content ledger.
//!
//! The ledger remembers which content ids have already been announced. A
//! [`LedgerGate`] sits in front of it and turns the separate read and write
//! primitives into an atomic claim, so two checks that surface the same item
//! at the same time cannot both announce it.

mod gate;
mod memory;
mod sqlite;

pub use gate::{Claim, LedgerGate};
pub use memory::MemoryLedger;
pub use sqlite::SqlxDedupLedger;

use async_trait::async_trait;

use crate::Result;

/// Persisted set of content ids that have been announced.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Whether `content_id` has been committed.
    async fn has_seen(&self, content_id: &str) -> Result<bool>;

    /// Record `content_id`. Repeated calls with the same id are no-ops.
    async fn mark_seen(&self, content_id: &str) -> Result<()>;
}
