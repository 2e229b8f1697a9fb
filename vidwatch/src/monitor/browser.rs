//! Shared headless Chromium used by the scrape-based monitors.
//!
//! One browser process is launched lazily on first use and reused by every
//! check. Each check runs in its own browser context so cookies and storage
//! never leak between accounts. The pool is owned by the service container,
//! which closes it on shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::storage::SetCookiesParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cookies::parse_auth_cookies;
use super::scrape::LinkScraper;
use crate::{Error, Result};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-infobars",
    "--ignore-certificate-errors",
    "--disable-extensions",
    "--disable-gpu",
];

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chromium executable; auto-detected when unset.
    pub chrome_path: Option<String>,
    pub user_agent: String,
    /// JSON cookie export applied to every scrape context.
    pub auth_cookies: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_cookies: None,
        }
    }
}

struct BrowserHandle {
    /// Write access is only needed to create contexts and to close.
    browser: RwLock<Browser>,
    handler: JoinHandle<()>,
}

/// Lazily launched, process-wide Chromium instance.
pub struct BrowserPool {
    settings: BrowserSettings,
    cookies: Vec<CookieParam>,
    inner: Mutex<Option<Arc<BrowserHandle>>>,
}

impl BrowserPool {
    pub fn new(settings: BrowserSettings) -> Self {
        let cookies = settings
            .auth_cookies
            .as_deref()
            .map(parse_auth_cookies)
            .unwrap_or_default();
        Self {
            settings,
            cookies,
            inner: Mutex::new(None),
        }
    }

    fn config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .args(LAUNCH_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.settings.user_agent));
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| Error::config(format!("invalid browser configuration: {e}")))
    }

    async fn handle(&self) -> Result<Arc<BrowserHandle>> {
        let mut slot = self.inner.lock().await;
        if let Some(handle) = slot.as_ref() {
            if !handle.handler.is_finished() {
                return Ok(handle.clone());
            }
            warn!("Browser connection lost, relaunching");
        }

        info!(headless = self.settings.headless, "Launching Chromium browser");
        let (browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| Error::fetch(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let handle = Arc::new(BrowserHandle {
            browser: RwLock::new(browser),
            handler,
        });
        *slot = Some(handle.clone());
        Ok(handle)
    }

    async fn scrape_in_context(
        handle: &BrowserHandle,
        context_id: BrowserContextId,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(Error::fetch)?;
        let page = handle
            .browser
            .read()
            .await
            .new_page(target)
            .await
            .map_err(|e| Error::fetch(format!("failed to open page: {e}")))?;

        let result = Self::collect_links(&page, url, selector, timeout).await;
        if let Err(e) = page.close().await {
            debug!(error = %e, "Failed to close page");
        }
        result
    }

    async fn collect_links(
        page: &chromiumoxide::Page,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        page.goto(url)
            .await
            .map_err(|e| Error::fetch(format!("navigation to {url} failed: {e}")))?;

        let script = format!(
            "Array.from(document.querySelectorAll({})).map(e => e.href)",
            serde_json::to_string(selector)?
        );
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let links: Vec<String> = page
                .evaluate(script.as_str())
                .await
                .map_err(|e| Error::fetch(format!("evaluation failed: {e}")))?
                .into_value()
                .map_err(|e| Error::Parse(format!("unexpected link list: {e}")))?;
            if !links.is_empty() {
                return Ok(links);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn apply_cookies(
        &self,
        handle: &BrowserHandle,
        context_id: &BrowserContextId,
    ) -> Result<()> {
        if self.cookies.is_empty() {
            return Ok(());
        }
        let params = SetCookiesParams {
            cookies: self.cookies.clone(),
            browser_context_id: Some(context_id.clone()),
        };
        handle
            .browser
            .read()
            .await
            .execute(params)
            .await
            .map_err(|e| Error::fetch(format!("failed to set auth cookies: {e}")))?;
        debug!(count = self.cookies.len(), "Auth cookies applied");
        Ok(())
    }

    /// Close the browser if it was ever launched.
    pub async fn shutdown(&self) {
        let Some(handle) = self.inner.lock().await.take() else {
            return;
        };
        info!("Closing Chromium browser");
        let mut browser = handle.browser.write().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "Failed to wait for browser exit");
        }
        handle.handler.abort();
    }
}

#[async_trait]
impl LinkScraper for BrowserPool {
    async fn links(&self, url: &str, selector: &str, timeout: Duration) -> Result<Vec<String>> {
        let handle = self.handle().await?;

        let context_id = {
            let mut browser = handle.browser.write().await;
            browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(|e| Error::fetch(format!("failed to create browser context: {e}")))?
        };

        let result = match self.apply_cookies(&handle, &context_id).await {
            Ok(()) => {
                Self::scrape_in_context(&handle, context_id.clone(), url, selector, timeout).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = handle
            .browser
            .read()
            .await
            .dispose_browser_context(context_id)
            .await
        {
            debug!(error = %e, "Failed to dispose browser context");
        }
        result
    }
}
