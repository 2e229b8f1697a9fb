//! YouTube monitor.
//!
//! A channel publishes to two feeds (regular uploads and shorts). Both are
//! fetched concurrently and the newer of the two heads is reported.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::PlatformMonitor;
use super::ytdlp::MetadataExtractor;
use crate::Error;
use crate::domain::{Account, ContentItem, Platform, UNKNOWN};

const DEFAULT_TITLE: &str = "New YouTube Video";

pub struct YouTubeMonitor {
    extractor: Arc<dyn MetadataExtractor>,
}

impl YouTubeMonitor {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Main and shorts feed URLs for an account.
    ///
    /// The resolved channel id gives canonical URLs; without one the stored
    /// URL is the main feed and its `/shorts` tab the second.
    pub fn feed_urls(account: &Account) -> (String, String) {
        match account.canonical_id.as_deref().filter(|id| !id.is_empty()) {
            Some(channel_id) => (
                format!("https://www.youtube.com/channel/{channel_id}"),
                format!("https://www.youtube.com/channel/{channel_id}/shorts"),
            ),
            None => {
                let base = account
                    .source_url
                    .strip_suffix('/')
                    .unwrap_or(&account.source_url);
                (account.source_url.clone(), format!("{base}/shorts"))
            }
        }
    }

    async fn fetch_latest(&self, url: &str) -> Option<ContentItem> {
        match self.extractor.latest_entry(url).await {
            Ok(Some(entry)) => entry.into_item(
                |id| format!("https://www.youtube.com/watch?v={id}"),
                DEFAULT_TITLE,
                || UNKNOWN.to_string(),
            ),
            Ok(None) => None,
            Err(Error::Parse(e)) => {
                warn!(url, error = %e, "Failed to parse yt-dlp output");
                None
            }
            // Expected for channels without shorts or with an invalid URL.
            Err(e) => {
                debug!(url, error = %e, "yt-dlp fetch failed");
                None
            }
        }
    }
}

/// Pick the newer of the two feed heads.
///
/// The shorts item wins only with a strictly greater timestamp (missing
/// counts as 0), so ties, including two missing timestamps, keep the main item.
pub fn pick_latest(main: Option<ContentItem>, shorts: Option<ContentItem>) -> Option<ContentItem> {
    match (main, shorts) {
        (Some(main), Some(shorts)) => {
            if shorts.published_or_epoch() > main.published_or_epoch() {
                Some(shorts)
            } else {
                Some(main)
            }
        }
        (main, shorts) => main.or(shorts),
    }
}

#[async_trait]
impl PlatformMonitor for YouTubeMonitor {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn check(&self, account: &Account) -> Vec<ContentItem> {
        let (main_url, shorts_url) = Self::feed_urls(account);
        let (main, shorts) = tokio::join!(
            self.fetch_latest(&main_url),
            self.fetch_latest(&shorts_url)
        );
        pick_latest(main, shorts).into_iter().collect()
    }
}
