//! Environment-driven application configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::{BrowserSettings, DEFAULT_SELECTOR_TIMEOUT};
use crate::notification::DEFAULT_DISCORD_API_BASE;
use crate::scheduler::SchedulerConfig;
use crate::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:vidwatch.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Bot token; only required to run the scheduler.
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub browser: BrowserSettings,
    pub yt_dlp_path: String,
    /// Upper bound on one yt-dlp invocation; unbounded when unset.
    pub extractor_timeout: Option<Duration>,
    pub selector_timeout: Duration,
    pub scheduler: SchedulerConfig,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        };

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            cycle_interval: millis(&get, "VIDWATCH_CYCLE_INTERVAL_MS")?
                .unwrap_or(defaults.cycle_interval),
            spread_window: millis(&get, "VIDWATCH_SPREAD_WINDOW_MS")?
                .unwrap_or(defaults.spread_window),
            initial_delay: millis(&get, "VIDWATCH_INITIAL_DELAY_MS")?
                .unwrap_or(defaults.initial_delay),
            drain_timeout: defaults.drain_timeout,
        };
        if scheduler.cycle_interval.is_zero() {
            return Err(Error::config(
                "VIDWATCH_CYCLE_INTERVAL_MS must be greater than zero",
            ));
        }

        let headless = match get("HEADLESS") {
            None => BrowserSettings::default().headless,
            Some(v) => parse_bool(&v)
                .ok_or_else(|| Error::config(format!("HEADLESS must be true or false, got {v:?}")))?,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            discord_token: get("DISCORD_TOKEN"),
            discord_api_base: get("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            browser: BrowserSettings {
                headless,
                chrome_path: get("CHROME_PATH"),
                auth_cookies: get("TIKTOK_AUTH_COOKIE"),
                ..BrowserSettings::default()
            },
            yt_dlp_path: get("YT_DLP_PATH")
                .unwrap_or_else(|| crate::monitor::DEFAULT_YT_DLP_PATH.to_string()),
            extractor_timeout: millis(&get, "VIDWATCH_EXTRACTOR_TIMEOUT_MS")?,
            selector_timeout: millis(&get, "VIDWATCH_SELECTOR_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_SELECTOR_TIMEOUT),
            scheduler,
            log_dir: get("VIDWATCH_LOG_DIR").map(PathBuf::from),
        })
    }

    /// The bot token, or a configuration error when it is missing.
    pub fn require_discord_token(&self) -> Result<&str> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| Error::config("DISCORD_TOKEN is not set"))
    }
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    get(key)
        .map(|v| {
            v.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| Error::config(format!("{key} must be a number of milliseconds, got {v:?}")))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
