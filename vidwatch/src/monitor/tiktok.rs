//! TikTok monitor, backed by the external metadata extractor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::PlatformMonitor;
use super::ytdlp::MetadataExtractor;
use crate::Error;
use crate::domain::{Account, ContentItem, Platform, UNKNOWN};

const DEFAULT_TITLE: &str = "New TikTok Video";

pub struct TikTokMonitor {
    extractor: Arc<dyn MetadataExtractor>,
}

impl TikTokMonitor {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }
}

/// Handle following `@` in a profile URL, e.g. `someone` for
/// `https://www.tiktok.com/@someone/video/1`.
pub(crate) fn handle_from_url(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once('@')?;
    let handle = rest.split(['/', '?', '#']).next().unwrap_or_default();
    (!handle.is_empty()).then_some(handle)
}

#[async_trait]
impl PlatformMonitor for TikTokMonitor {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn check(&self, account: &Account) -> Vec<ContentItem> {
        let url = account.source_url.as_str();
        let entry = match self.extractor.latest_entry(url).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                info!(url, "No videos found");
                return Vec::new();
            }
            Err(Error::Parse(e)) => {
                error!(url, error = %e, "Error parsing yt-dlp output");
                return Vec::new();
            }
            Err(e) => {
                error!(url, error = %e, "Error checking account (yt-dlp)");
                return Vec::new();
            }
        };

        entry
            .into_item(
                |_| url.to_string(),
                DEFAULT_TITLE,
                || handle_from_url(url).unwrap_or(UNKNOWN).to_string(),
            )
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ytdlp::{VideoEntry, parse_first_entry};

    struct Canned(&'static str);

    #[async_trait]
    impl MetadataExtractor for Canned {
        async fn latest_entry(&self, _url: &str) -> crate::Result<Option<VideoEntry>> {
            parse_first_entry(self.0)
        }

        async fn print_field(&self, _url: &str, _field: &str) -> crate::Result<Option<String>> {
            Ok(None)
        }
    }

    fn account() -> Account {
        Account::new(Platform::TikTok, "https://www.tiktok.com/@dancer", "chan")
    }

    #[test]
    fn test_handle_from_url() {
        assert_eq!(
            handle_from_url("https://www.tiktok.com/@dancer"),
            Some("dancer")
        );
        assert_eq!(
            handle_from_url("https://www.tiktok.com/@dancer/video/1?lang=en"),
            Some("dancer")
        );
        assert_eq!(handle_from_url("https://www.tiktok.com/dancer"), None);
        assert_eq!(handle_from_url("https://www.tiktok.com/@"), None);
    }

    #[tokio::test]
    async fn test_full_entry() {
        let monitor = TikTokMonitor::new(Arc::new(Canned(
            r#"{"id":"7301","webpage_url":"https://www.tiktok.com/@dancer/video/7301","title":"moves","uploader":"Dancer"}"#,
        )));
        let items = monitor.check(&account()).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "7301");
        assert_eq!(items[0].url, "https://www.tiktok.com/@dancer/video/7301");
        assert_eq!(items[0].title, "moves");
        assert_eq!(items[0].author, "Dancer");
    }

    #[tokio::test]
    async fn test_defaults_from_account_url() {
        let monitor = TikTokMonitor::new(Arc::new(Canned(
            r#"{"display_id":"7302","url":"https://v.tiktok.com/7302"}"#,
        )));
        let items = monitor.check(&account()).await;
        assert_eq!(items[0].id, "7302");
        assert_eq!(items[0].url, "https://v.tiktok.com/7302");
        assert_eq!(items[0].title, DEFAULT_TITLE);
        assert_eq!(items[0].author, "dancer");
    }

    #[tokio::test]
    async fn test_unparseable_output_is_empty() {
        let monitor = TikTokMonitor::new(Arc::new(Canned("<html>blocked</html>")));
        assert!(monitor.check(&account()).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_output_is_empty() {
        let monitor = TikTokMonitor::new(Arc::new(Canned("")));
        assert!(monitor.check(&account()).await.is_empty());
    }
}
