//! Observed content items and the notification payload built from them.

use serde::{Deserialize, Serialize};

/// Placeholder used when a source exposes no author or title.
pub const UNKNOWN: &str = "Unknown";

/// A single published item as observed at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Platform-unique identifier; the dedup key.
    pub id: String,
    pub url: String,
    pub title: String,
    pub author: String,
    /// Unix timestamp in seconds, if the source exposes one.
    pub published_at: Option<i64>,
}

impl ContentItem {
    /// Publication time with a missing value treated as the earliest instant.
    pub fn published_or_epoch(&self) -> i64 {
        self.published_at.unwrap_or(0)
    }

    pub fn payload(&self) -> NotificationPayload {
        NotificationPayload {
            author: self.author.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// What the dispatcher needs to announce an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub author: String,
    pub title: String,
    pub url: String,
}

impl NotificationPayload {
    /// Render the chat message body.
    pub fn render(&self) -> String {
        let title = if self.title.is_empty() {
            "No Title"
        } else {
            self.title.as_str()
        };
        format!(
            "**New Upload!** \u{1F3A5}\n**Author:** {}\n**Title:** {}\n**Link:** {}",
            self.author, title, self.url
        )
    }
}
