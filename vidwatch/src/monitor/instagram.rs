//! Instagram monitor (reels grid scrape).

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::PlatformMonitor;
use super::scrape::{LinkScraper, has_path_segment, newest_link, with_reels_tab};
use crate::domain::{Account, ContentItem, Platform, UNKNOWN};

const REEL_SELECTOR: &str = r#"a[href^="/reel/"], a[href^="/p/"]"#;
const DEFAULT_TITLE: &str = "New Instagram Reel";

static POST_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:reel|p)/([^/?#]+)").expect("valid post id regex"));

pub struct InstagramMonitor {
    scraper: Arc<dyn LinkScraper>,
    selector_timeout: Duration,
}

impl InstagramMonitor {
    pub fn new(scraper: Arc<dyn LinkScraper>, selector_timeout: Duration) -> Self {
        Self {
            scraper,
            selector_timeout,
        }
    }

    /// Reels tab of a profile URL.
    pub fn listing_url(url: &str) -> String {
        if has_path_segment(url, &["reels"]) {
            url.to_string()
        } else {
            with_reels_tab(url)
        }
    }

    /// Shortcode of a post or reel link, or the whole link when none is found.
    pub fn content_id(link: &str) -> String {
        POST_ID_REGEX
            .captures(link)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| link.to_string())
    }

    fn author(url: &str) -> String {
        url.split_once("instagram.com/")
            .and_then(|(_, rest)| rest.split('/').next())
            .filter(|handle| !handle.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string()
    }
}

#[async_trait]
impl PlatformMonitor for InstagramMonitor {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn check(&self, account: &Account) -> Vec<ContentItem> {
        let listing = Self::listing_url(&account.source_url);
        let Some(link) = newest_link(
            self.scraper.as_ref(),
            "instagram",
            &listing,
            REEL_SELECTOR,
            self.selector_timeout,
        )
        .await
        else {
            return Vec::new();
        };

        vec![ContentItem {
            id: Self::content_id(&link),
            url: link,
            title: DEFAULT_TITLE.to_string(),
            author: Self::author(&account.source_url),
            published_at: None,
        }]
    }
}
