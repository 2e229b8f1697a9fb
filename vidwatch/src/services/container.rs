//! Service container for dependency injection.
//!
//! The ServiceContainer builds every application service from the
//! configuration and owns the shared resources (database pool, browser,
//! scheduler task) so shutdown can release them in order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::accounts::AccountService;
use crate::config::AppConfig;
use crate::database::repositories::SqlxAccountRepository;
use crate::ledger::{DedupLedger, SqlxDedupLedger};
use crate::monitor::{BrowserPool, MetadataExtractor, MonitorRegistry, YtDlp};
use crate::notification::{DiscordConfig, DiscordDispatcher, NotificationDispatcher};
use crate::scheduler::{Scheduler, SchedulerConfig, TokioClock};
use crate::{Error, Result};

/// Extra time granted on top of the scheduler's own drain timeout.
const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Database connection pool.
    pub pool: SqlitePool,
    /// Account management.
    pub accounts: Arc<AccountService>,
    /// Shared Chromium instance for scrape-based monitors.
    pub browser: Arc<BrowserPool>,
    repository: Arc<SqlxAccountRepository>,
    ledger: Arc<dyn DedupLedger>,
    monitors: MonitorRegistry,
    scheduler_config: SchedulerConfig,
    discord: Option<DiscordConfig>,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Create a new service container from configuration and an open pool.
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        info!("Initializing service container");

        let repository = Arc::new(SqlxAccountRepository::new(pool.clone()));
        let extractor: Arc<dyn MetadataExtractor> = Arc::new(YtDlp::new(
            config.yt_dlp_path.clone(),
            config.extractor_timeout,
        ));
        let browser = Arc::new(BrowserPool::new(config.browser.clone()));
        let monitors = MonitorRegistry::with_defaults(
            extractor.clone(),
            browser.clone(),
            config.selector_timeout,
        );

        let discord = config.discord_token.as_ref().map(|token| DiscordConfig {
            token: token.clone(),
            api_base: config.discord_api_base.clone(),
        });

        Self {
            accounts: Arc::new(AccountService::new(repository.clone(), extractor)),
            ledger: Arc::new(SqlxDedupLedger::new(pool.clone())),
            pool,
            browser,
            repository,
            monitors,
            scheduler_config: config.scheduler.clone(),
            discord,
            scheduler_task: Mutex::new(None),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Build a scheduler over the stored accounts and the persistent ledger.
    pub fn scheduler(&self, dispatcher: Arc<dyn NotificationDispatcher>) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(
            self.repository.clone(),
            self.monitors.clone(),
            self.ledger.clone(),
            dispatcher,
            Arc::new(TokioClock),
            self.scheduler_config.clone(),
        ))
    }

    /// Start the scheduler with the Discord dispatcher in the background.
    pub fn start(&self) -> Result<()> {
        let discord = self
            .discord
            .clone()
            .ok_or_else(|| Error::config("DISCORD_TOKEN is not set"))?;
        let dispatcher = Arc::new(DiscordDispatcher::new(discord)?);

        let mut task = self.scheduler_task.lock();
        if task.is_some() {
            return Err(Error::Other("scheduler already running".to_string()));
        }
        let scheduler = self.scheduler(dispatcher);
        *task = Some(tokio::spawn(
            scheduler.run(self.cancellation_token.child_token()),
        ));
        info!("Scheduler started");
        Ok(())
    }

    /// Shutdown all services gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down services");

        // Signal all background tasks to stop
        self.cancellation_token.cancel();

        let task = self.scheduler_task.lock().take();
        if let Some(task) = task {
            let timeout = self.scheduler_config.drain_timeout + SHUTDOWN_SLACK;
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Scheduler task failed"),
                Err(_) => warn!("Shutdown timeout reached, abandoning scheduler"),
            }
        }

        info!("Closing browser...");
        self.browser.shutdown().await;

        info!("Closing database pool...");
        self.pool.close().await;

        info!("Services shut down");
        Ok(())
    }

    /// Get the cancellation token for external use.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Check if shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
