//! Platform monitors.
//!
//! A monitor answers one question for one account: "what is the newest
//! content right now?". Monitors never decide whether an item is new; that
//! belongs to the ledger. Fetch and parse failures are logged inside the
//! monitor and reported to the caller as an empty result.

mod browser;
mod cookies;
mod facebook;
mod instagram;
mod registry;
mod scrape;
mod tiktok;
mod youtube;
mod ytdlp;

pub use browser::{BrowserPool, BrowserSettings};
pub use facebook::FacebookMonitor;
pub use instagram::InstagramMonitor;
pub use registry::MonitorRegistry;
pub use scrape::{DEFAULT_SELECTOR_TIMEOUT, LinkScraper};
pub use tiktok::TikTokMonitor;
pub(crate) use tiktok::handle_from_url;
pub use youtube::{YouTubeMonitor, pick_latest};
pub use ytdlp::{DEFAULT_YT_DLP_PATH, MetadataExtractor, VideoEntry, YtDlp, parse_first_entry};

use async_trait::async_trait;

use crate::domain::{Account, ContentItem, Platform};

/// Fetches the currently-latest content of an account on one platform.
#[async_trait]
pub trait PlatformMonitor: Send + Sync {
    /// The platform this monitor serves.
    fn platform(&self) -> Platform;

    /// Return zero or more candidate items, newest first.
    async fn check(&self, account: &Account) -> Vec<ContentItem>;
}
