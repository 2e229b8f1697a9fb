//! Tracked account.

use serde::{Deserialize, Serialize};

use super::Platform;

/// A tracked (platform, source URL) pair bound to a notification channel.
///
/// Accounts are immutable once created; the scheduler only ever holds
/// snapshot copies for the duration of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub platform: Platform,
    pub source_url: String,
    /// Platform-specific resolved identifier (YouTube channel id, handle).
    pub canonical_id: Option<String>,
    pub guild_id: Option<String>,
    pub destination_channel_id: String,
}

impl Account {
    /// Build an account value that has not been stored yet.
    pub fn new(
        platform: Platform,
        source_url: impl Into<String>,
        destination_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            platform,
            source_url: source_url.into(),
            canonical_id: None,
            guild_id: None,
            destination_channel_id: destination_channel_id.into(),
        }
    }

    pub fn with_canonical_id(mut self, canonical_id: Option<String>) -> Self {
        self.canonical_id = canonical_id;
        self
    }

    pub fn with_guild_id(mut self, guild_id: Option<String>) -> Self {
        self.guild_id = guild_id;
        self
    }
}
