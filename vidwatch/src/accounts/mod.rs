//! Account management: add, remove and list tracked accounts.

use std::sync::Arc;

use tracing::{error, info};

use crate::database::models::AccountDbModel;
use crate::database::repositories::AccountRepository;
use crate::domain::{Account, Platform};
use crate::monitor::{MetadataExtractor, handle_from_url};
use crate::{Error, Result};

/// Maximum length of a rendered account list before it is cut off.
const LIST_MAX_CHARS: usize = 1900;

const LIST_TRUNCATED_SUFFIX: &str = "... (truncated)";

pub const EMPTY_LIST_MESSAGE: &str = "No accounts are being monitored.";

pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    extractor: Arc<dyn MetadataExtractor>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { repo, extractor }
    }

    /// Start tracking `url` on `platform`, notifying `channel_id`.
    ///
    /// YouTube accounts must resolve to a channel id or nothing is stored.
    pub async fn add(
        &self,
        platform: Platform,
        url: &str,
        channel_id: &str,
        guild_id: Option<String>,
    ) -> Result<Account> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("account URL must not be empty"));
        }
        if channel_id.trim().is_empty() {
            return Err(Error::validation("destination channel must not be empty"));
        }

        let canonical_id = match platform {
            Platform::YouTube => Some(resolve_channel_id(self.extractor.as_ref(), url).await?),
            _ => handle_from_url(url).map(ToOwned::to_owned),
        };

        let account = Account::new(platform, url, channel_id.trim())
            .with_canonical_id(canonical_id)
            .with_guild_id(guild_id);
        let created = self.repo.create_account(&account).await?;
        info!(
            account_id = created.id,
            platform = %platform,
            url,
            channel_id,
            "Added account"
        );
        Ok(created)
    }

    /// Stop tracking an account. Fails with `NotFound` for unknown ids.
    pub async fn remove(&self, id: i64) -> Result<()> {
        if !self.repo.delete_account(id).await? {
            return Err(Error::not_found("Account", id.to_string()));
        }
        info!(account_id = id, "Removed account");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<AccountDbModel>> {
        self.repo.list_accounts().await
    }

    /// Human-readable summary of all tracked accounts.
    pub async fn summary(&self) -> Result<String> {
        Ok(format_list(&self.list().await?))
    }
}

/// YouTube channel id for a channel URL.
///
/// `/channel/<id>` URLs are read directly; anything else (handles, custom
/// URLs, video links) is resolved through the extractor.
pub async fn resolve_channel_id(extractor: &dyn MetadataExtractor, url: &str) -> Result<String> {
    if let Some(id) = channel_id_from_url(url) {
        return Ok(id.to_string());
    }

    match extractor.print_field(url, "channel_id").await {
        Ok(Some(id)) => Ok(id),
        Ok(None) => {
            error!(url, "yt-dlp did not return a channel ID");
            Err(Error::Resolution(format!(
                "could not resolve YouTube channel ID from {url}; try the full /channel/ URL"
            )))
        }
        Err(e) => {
            error!(url, error = %e, "Error resolving YouTube channel ID");
            Err(Error::Resolution(format!(
                "could not resolve YouTube channel ID from {url}: {e}"
            )))
        }
    }
}

fn channel_id_from_url(url: &str) -> Option<&str> {
    let mut segments = url.split('/');
    segments.find(|s| *s == "channel")?;
    segments
        .next()
        .map(|s| s.split(['?', '#']).next().unwrap_or_default())
        .filter(|s| !s.is_empty())
}

/// One line per account, cut at a fixed length.
pub fn format_list(rows: &[AccountDbModel]) -> String {
    if rows.is_empty() {
        return EMPTY_LIST_MESSAGE.to_string();
    }

    let list = rows
        .iter()
        .map(|a| {
            format!(
                "**ID: {}** | {} | <{}> | <#{}>",
                a.id, a.platform, a.url, a.discord_channel_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    match list.char_indices().nth(LIST_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &list[..cut], LIST_TRUNCATED_SUFFIX),
        None => list,
    }
}
