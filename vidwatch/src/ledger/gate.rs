//! Atomic claim over a [`DedupLedger`].

use std::sync::Arc;

use dashmap::DashSet;

use super::DedupLedger;
use crate::Result;

/// Serializes "is this new?" decisions for each content id.
///
/// A content id can be claimed by at most one check at a time. The claim is
/// granted only when the ledger has no record of the id; committing the
/// claim writes the record, dropping it leaves the id eligible again.
#[derive(Clone)]
pub struct LedgerGate {
    ledger: Arc<dyn DedupLedger>,
    pending: Arc<DashSet<String>>,
}

impl LedgerGate {
    pub fn new(ledger: Arc<dyn DedupLedger>) -> Self {
        Self {
            ledger,
            pending: Arc::new(DashSet::new()),
        }
    }

    /// Insert-if-absent: returns a claim when `content_id` is neither
    /// committed nor claimed by another in-flight check.
    pub async fn claim(&self, content_id: &str) -> Result<Option<Claim>> {
        if !self.pending.insert(content_id.to_string()) {
            return Ok(None);
        }

        // From here on the reservation is released by `Claim::drop`, including
        // on the early returns below.
        let claim = Claim {
            content_id: content_id.to_string(),
            ledger: self.ledger.clone(),
            pending: self.pending.clone(),
        };

        if self.ledger.has_seen(content_id).await? {
            return Ok(None);
        }

        Ok(Some(claim))
    }

    /// Number of ids currently claimed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Exclusive right to announce one content id.
pub struct Claim {
    content_id: String,
    ledger: Arc<dyn DedupLedger>,
    pending: Arc<DashSet<String>>,
}

impl Claim {
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Record the id as announced. Must only be called after delivery succeeded.
    pub async fn commit(self) -> Result<()> {
        self.ledger.mark_seen(&self.content_id).await
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.pending.remove(&self.content_id);
    }
}

impl std::fmt::Debug for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Claim")
            .field("content_id", &self.content_id)
            .finish()
    }
}
