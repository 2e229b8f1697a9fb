//! yt-dlp metadata extraction.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::ContentItem;
use crate::{Error, Result};

/// Default yt-dlp executable name.
pub const DEFAULT_YT_DLP_PATH: &str = "yt-dlp";

/// One entry of yt-dlp's `-j` output. Only the fields we use are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoEntry {
    pub id: Option<String>,
    pub display_id: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    /// Upload time as Unix seconds; yt-dlp may emit it as a float.
    pub timestamp: Option<f64>,
}

impl VideoEntry {
    /// The entry's identifier, preferring `id` over `display_id`.
    pub fn content_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.display_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Link to the entry, preferring `webpage_url` over `url`.
    pub fn link(&self) -> Option<&str> {
        self.webpage_url.as_deref().or(self.url.as_deref())
    }

    pub fn published_at(&self) -> Option<i64> {
        self.timestamp
            .filter(|t| t.is_finite())
            .map(|t| t as i64)
    }

    /// Normalize into a [`ContentItem`]. Returns `None` without an id.
    pub fn into_item(
        self,
        fallback_url: impl FnOnce(&str) -> String,
        default_title: &str,
        default_author: impl FnOnce() -> String,
    ) -> Option<ContentItem> {
        let id = self.content_id()?.to_string();
        let url = self
            .link()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| fallback_url(&id));
        let published_at = self.published_at();
        Some(ContentItem {
            url,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| default_title.to_string()),
            author: self
                .uploader
                .filter(|a| !a.is_empty())
                .unwrap_or_else(default_author),
            published_at,
            id,
        })
    }
}

/// Parse the first JSON record of yt-dlp's line-delimited output.
///
/// Empty output yields `Ok(None)`; a malformed first record is a parse error.
pub fn parse_first_entry(stdout: &str) -> Result<Option<VideoEntry>> {
    let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| Error::Parse(format!("invalid yt-dlp JSON: {e}")))
}

/// Out-of-process media metadata extractor.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Newest entry published at `url`, if any.
    async fn latest_entry(&self, url: &str) -> Result<Option<VideoEntry>>;

    /// Print a single metadata field of the newest entry at `url`.
    async fn print_field(&self, url: &str, field: &str) -> Result<Option<String>>;
}

/// [`MetadataExtractor`] backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary_path: String,
    timeout: Option<Duration>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP_PATH, None)
    }
}

impl YtDlp {
    /// `timeout` bounds each invocation; `None` waits for the tool to exit.
    pub fn new(binary_path: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = process_utils::tokio_command(&self.binary_path);
        cmd.args(args);
        debug!(binary = %self.binary_path, ?args, "Running yt-dlp");
        Ok(process_utils::capture_stdout(&mut cmd, self.timeout).await?)
    }
}

#[async_trait]
impl MetadataExtractor for YtDlp {
    async fn latest_entry(&self, url: &str) -> Result<Option<VideoEntry>> {
        let stdout = self.run(&["-j", "--playlist-end", "1", url]).await?;
        parse_first_entry(&stdout)
    }

    async fn print_field(&self, url: &str, field: &str) -> Result<Option<String>> {
        let stdout = self
            .run(&["--print", field, "--playlist-end", "1", url])
            .await?;
        Ok(stdout
            .lines()
            .next()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "NA")
            .map(ToOwned::to_owned))
    }
}
