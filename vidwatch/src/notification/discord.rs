//! Discord bot notification dispatcher.
//!
//! Posts plain-text messages through the bot REST API:
//! - Authenticates with the bot token
//! - Retries on 429 responses respecting Retry-After
//! - Maps every other failure to a delivery error

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

use super::NotificationDispatcher;
use crate::domain::NotificationPayload;
use crate::utils::http_client;
use crate::{Error, Result};

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Maximum number of attempts for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Longest rate-limit wait honoured inside one send.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    /// REST API root, without trailing slash.
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
        }
    }
}

pub struct DiscordDispatcher {
    config: DiscordConfig,
    client: Client,
}

impl DiscordDispatcher {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(Error::config("DISCORD_TOKEN must not be empty"));
        }
        let client = http_client::build_client(REQUEST_TIMEOUT)
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!(
            "{}/channels/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            channel_id
        )
    }

    async fn send_with_retry(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bot {}", self.config.token))
                .json(body)
                .send()
                .await
                .map_err(|e| Error::delivery(format!("Discord request failed: {e}")))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(response.headers());

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Discord rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(Error::delivery(format!(
                        "Discord rate limit exceeded after {MAX_RATE_LIMIT_RETRIES} retries"
                    )));
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                if wait_duration > MAX_RETRY_WAIT {
                    warn!(
                        "Discord rate limit wait {:?} exceeds {:?}, giving up",
                        wait_duration, MAX_RETRY_WAIT
                    );
                    return Err(Error::delivery(format!(
                        "Discord rate limited for {wait_duration:?}"
                    )));
                }
                debug!(
                    "Discord rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(Error::delivery("Discord channel not found"));
            }

            let text = response.text().await.unwrap_or_default();
            return Err(Error::delivery(format!(
                "Discord request failed: {status} - {text}"
            )));
        }
    }
}

/// Retry-After from a 429 response, falling back to X-RateLimit-Reset-After.
///
/// Values too large for a `Duration` saturate to `Duration::MAX`.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok()?.trim().parse::<f64>().ok())
        .find_map(|secs| match Duration::try_from_secs_f64(secs) {
            Ok(wait) => Some(wait),
            Err(_) if secs > 0.0 => Some(Duration::MAX),
            Err(_) => None,
        })
}

#[async_trait]
impl NotificationDispatcher for DiscordDispatcher {
    async fn send(&self, channel_id: &str, payload: &NotificationPayload) -> Result<()> {
        let url = self.messages_url(channel_id);
        let body = json!({ "content": payload.render() });
        self.send_with_retry(&url, &body).await?;
        debug!(channel_id, url = %payload.url, "Discord notification sent");
        Ok(())
    }
}
