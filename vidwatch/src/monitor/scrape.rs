//! Shared plumbing for monitors that read a rendered listing page.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::Result;

/// Default maximum wait for the first matching content link.
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads a page and reads link targets out of it.
#[async_trait]
pub trait LinkScraper: Send + Sync {
    /// Navigate to `url` and return the absolute `href` of every element
    /// matching `selector`, in document order.
    ///
    /// Waits up to `timeout` for at least one match; an empty vector means
    /// nothing matched in time.
    async fn links(&self, url: &str, selector: &str, timeout: Duration) -> Result<Vec<String>>;
}

/// First matching link on a listing page, which the platforms order newest
/// first. Failures are logged and reported as `None`.
pub(crate) async fn newest_link(
    scraper: &dyn LinkScraper,
    platform: &str,
    url: &str,
    selector: &str,
    timeout: Duration,
) -> Option<String> {
    match scraper.links(url, selector, timeout).await {
        Ok(links) => {
            if links.is_empty() {
                debug!(platform, url, "No content links appeared before timeout");
            }
            links.into_iter().next()
        }
        Err(e) => {
            error!(platform, url, error = %e, "Error checking listing page");
            None
        }
    }
}

/// Whether any path segment of `url` is one of `names`.
pub(crate) fn has_path_segment(url: &str, names: &[&str]) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    path.split('/').skip(1).any(|segment| names.contains(&segment))
}

/// Append the `reels/` tab to a profile URL.
pub(crate) fn with_reels_tab(url: &str) -> String {
    if url.ends_with('/') {
        format!("{url}reels/")
    } else {
        format!("{url}/reels/")
    }
}
