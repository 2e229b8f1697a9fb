//! Account database model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::Error;
use crate::domain::{Account, Platform};

/// Row of the `accounts` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountDbModel {
    pub id: i64,
    /// Platform tag (`youtube`, `tiktok`, `instagram`, `facebook`).
    pub platform: String,
    pub url: String,
    /// Resolved canonical identifier, if any.
    pub account_id: Option<String>,
    pub guild_id: Option<String>,
    pub discord_channel_id: String,
    /// Unix epoch milliseconds (UTC) when created.
    pub created_at: i64,
}

impl AccountDbModel {
    pub fn from_domain(account: &Account) -> Self {
        Self {
            id: account.id,
            platform: account.platform.as_str().to_string(),
            url: account.source_url.clone(),
            account_id: account.canonical_id.clone(),
            guild_id: account.guild_id.clone(),
            discord_channel_id: account.destination_channel_id.clone(),
            created_at: crate::database::time::now_ms(),
        }
    }
}

impl TryFrom<AccountDbModel> for Account {
    type Error = Error;

    fn try_from(row: AccountDbModel) -> Result<Self, Self::Error> {
        let platform =
            Platform::from_str(&row.platform).map_err(|_| Error::UnknownPlatform(row.platform))?;
        Ok(Account {
            id: row.id,
            platform,
            source_url: row.url,
            canonical_id: row.account_id,
            guild_id: row.guild_id,
            destination_channel_id: row.discord_channel_id,
        })
    }
}
