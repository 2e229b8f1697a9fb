//! In-process ledger, used for dry runs and tests.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::DedupLedger;
use crate::Result;

/// Non-persistent ledger backed by a hash set.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[async_trait]
impl DedupLedger for MemoryLedger {
    async fn has_seen(&self, content_id: &str) -> Result<bool> {
        Ok(self.seen.lock().contains(content_id))
    }

    async fn mark_seen(&self, content_id: &str) -> Result<()> {
        self.seen.lock().insert(content_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_seen_is_idempotent() {
        let ledger = MemoryLedger::new();
        assert!(!ledger.has_seen("x").await.unwrap());

        ledger.mark_seen("x").await.unwrap();
        assert!(ledger.has_seen("x").await.unwrap());

        ledger.mark_seen("x").await.unwrap();
        assert!(ledger.has_seen("x").await.unwrap());
        assert_eq!(ledger.len(), 1);
    }
}
