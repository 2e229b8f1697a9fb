//! Outbound notifications.

mod discord;

pub use discord::{DEFAULT_DISCORD_API_BASE, DiscordConfig, DiscordDispatcher};

use async_trait::async_trait;

use crate::Result;
use crate::domain::NotificationPayload;

/// Delivers a new-content announcement to a chat channel.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Post `payload` to `channel_id`. Fails with [`crate::Error::Delivery`]
    /// when the message could not be delivered.
    async fn send(&self, channel_id: &str, payload: &NotificationPayload) -> Result<()>;
}
