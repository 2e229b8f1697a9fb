//! Facebook monitor (reels tab scrape).

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::PlatformMonitor;
use super::scrape::{LinkScraper, has_path_segment, newest_link, with_reels_tab};
use crate::domain::{Account, ContentItem, Platform, UNKNOWN};

const REEL_SELECTOR: &str = r#"a[href*="/reel/"]"#;
const DEFAULT_TITLE: &str = "New Facebook Reel";

static REEL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/reel/(\d+)").expect("valid reel id regex"));

pub struct FacebookMonitor {
    scraper: Arc<dyn LinkScraper>,
    selector_timeout: Duration,
}

impl FacebookMonitor {
    pub fn new(scraper: Arc<dyn LinkScraper>, selector_timeout: Duration) -> Self {
        Self {
            scraper,
            selector_timeout,
        }
    }

    /// Reels tab of a page URL. URLs already pointing at reels are kept.
    pub fn listing_url(url: &str) -> String {
        if has_path_segment(url, &["reel", "reels"]) {
            url.to_string()
        } else {
            with_reels_tab(url)
        }
    }

    /// Numeric reel id of a link, or the whole link when none is found.
    pub fn content_id(link: &str) -> String {
        REEL_ID_REGEX
            .captures(link)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| link.to_string())
    }
}

#[async_trait]
impl PlatformMonitor for FacebookMonitor {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn check(&self, account: &Account) -> Vec<ContentItem> {
        let listing = Self::listing_url(&account.source_url);
        let Some(link) = newest_link(
            self.scraper.as_ref(),
            "facebook",
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
            author: UNKNOWN.to_string(),
            published_at: None,
        }]
    }
}
