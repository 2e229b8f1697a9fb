//! Scheduler service.
//!
//! One loop owns a single timer queue. Every `cycle_interval` it snapshots
//! the account list and queues one fire instant per account, spaced
//! `per_account_delay` apart. Due entries are spawned as independent check
//! tasks; the loop itself never awaits a check.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::guard::InFlightGuard;
use super::plan::{TimerQueue, per_account_delay, stagger_offsets};
use super::{AccountSource, Clock};
use crate::Result;
use crate::domain::{Account, ContentItem};
use crate::ledger::{DedupLedger, LedgerGate};
use crate::monitor::MonitorRegistry;
use crate::notification::NotificationDispatcher;

/// Default interval between cycle starts (20 seconds).
const DEFAULT_CYCLE_INTERVAL_MS: u64 = 20_000;

/// Default span over which one cycle's checks are spread (60 seconds).
const DEFAULT_SPREAD_WINDOW_MS: u64 = 60_000;

/// Default delay before the first cycle (5 seconds).
const DEFAULT_INITIAL_DELAY_MS: u64 = 5_000;

/// Default time to wait for in-flight checks on shutdown.
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 30_000;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub cycle_interval: Duration,
    pub spread_window: Duration,
    pub initial_delay: Duration,
    /// How long shutdown waits for running checks before giving up on them.
    pub drain_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_millis(DEFAULT_CYCLE_INTERVAL_MS),
            spread_window: Duration::from_millis(DEFAULT_SPREAD_WINDOW_MS),
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            drain_timeout: Duration::from_millis(DEFAULT_DRAIN_TIMEOUT_MS),
        }
    }
}

/// Result of one account check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The monitor ran. `failed` counts items whose announcement failed and
    /// remain eligible for the next check.
    Done { notified: usize, failed: usize },
    /// No monitor could serve the account.
    Failed,
}

pub struct Scheduler {
    accounts: Arc<dyn AccountSource>,
    monitors: MonitorRegistry,
    gate: LedgerGate,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    in_flight: InFlightGuard,
    tracker: TaskTracker,
    skipped: AtomicU64,
}

impl Scheduler {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        monitors: MonitorRegistry,
        ledger: Arc<dyn DedupLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            accounts,
            monitors,
            gate: LedgerGate::new(ledger),
            dispatcher,
            clock,
            config,
            in_flight: InFlightGuard::new(),
            tracker: TaskTracker::new(),
            skipped: AtomicU64::new(0),
        }
    }

    /// Number of fire slots dropped because the account was still being checked.
    pub fn skipped_checks(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> &InFlightGuard {
        &self.in_flight
    }

    /// Run cycles until `cancel` fires, then wait for in-flight checks.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.config.cycle_interval.max(Duration::from_millis(1));
        info!(
            cycle_interval_ms = interval.as_millis() as u64,
            spread_window_ms = self.config.spread_window.as_millis() as u64,
            "Starting scheduler"
        );

        let mut queue: TimerQueue<Account> = TimerQueue::new();
        let mut next_cycle = self.clock.now() + self.config.initial_delay;

        loop {
            let deadline = queue
                .next_deadline()
                .map_or(next_cycle, |at| at.min(next_cycle));

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler received cancellation signal");
                    break;
                }
                _ = self.clock.sleep_until(deadline) => {}
            }

            let now = self.clock.now();
            if now >= next_cycle {
                self.plan_cycle(next_cycle, &mut queue).await;
                next_cycle += interval;
                if next_cycle <= now {
                    let mut missed = 0u64;
                    while next_cycle <= now {
                        next_cycle += interval;
                        missed += 1;
                    }
                    warn!(missed, "Scheduler fell behind, skipping missed cycles");
                }
            }

            while let Some(account) = queue.pop_due(self.clock.now()) {
                self.spawn_check(account);
            }
        }

        self.drain().await;
    }

    async fn plan_cycle(&self, cycle_start: Instant, queue: &mut TimerQueue<Account>) {
        let accounts = match self.accounts.list().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "Failed to list accounts, skipping cycle");
                return;
            }
        };

        if accounts.is_empty() {
            debug!("No accounts to check");
            return;
        }

        debug!(
            accounts = accounts.len(),
            per_account_delay_ms =
                per_account_delay(self.config.spread_window, accounts.len()).as_millis() as u64,
            "Starting check cycle"
        );

        let offsets = stagger_offsets(self.config.spread_window, accounts.len());
        for (account, offset) in accounts.into_iter().zip(offsets) {
            queue.push(cycle_start + offset, account);
        }
    }

    fn spawn_check(self: &Arc<Self>, account: Account) {
        let Some(ticket) = self.in_flight.try_acquire(account.id) else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            warn!(
                account_id = account.id,
                platform = %account.platform,
                url = %account.source_url,
                "Check still in progress, skipping"
            );
            return;
        };

        let this = self.clone();
        self.tracker.spawn(async move {
            let _ticket = ticket;
            let result = AssertUnwindSafe(this.check_account(&account))
                .catch_unwind()
                .await;
            match result {
                Ok(outcome) => debug!(account_id = account.id, ?outcome, "Check finished"),
                Err(panic) => error!(
                    account_id = account.id,
                    platform = %account.platform,
                    "Check panicked: {}",
                    panic_message(panic.as_ref())
                ),
            }
        });
    }

    /// Check one account and announce every candidate not yet in the ledger.
    pub async fn check_account(&self, account: &Account) -> CheckOutcome {
        let monitor = match self.monitors.resolve(account.platform) {
            Ok(monitor) => monitor,
            Err(e) => {
                warn!(account_id = account.id, error = %e, "Skipping account");
                return CheckOutcome::Failed;
            }
        };

        let items = monitor.check(account).await;
        let mut notified = 0;
        let mut failed = 0;
        for item in &items {
            match self.announce(account, item).await {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(e) => {
                    failed += 1;
                    error!(
                        account_id = account.id,
                        content_id = %item.id,
                        error = %e,
                        "Failed to announce content"
                    );
                }
            }
        }

        CheckOutcome::Done { notified, failed }
    }

    /// Returns `false` when the item was already announced or is being
    /// announced by another check.
    async fn announce(&self, account: &Account, item: &ContentItem) -> Result<bool> {
        let Some(claim) = self.gate.claim(&item.id).await? else {
            return Ok(false);
        };

        info!(
            account_id = account.id,
            platform = %account.platform,
            content_id = %item.id,
            url = %item.url,
            "New content detected"
        );

        // An error drops the claim uncommitted, leaving the id eligible.
        self.dispatcher
            .send(&account.destination_channel_id, &item.payload())
            .await?;
        claim.commit().await?;
        Ok(true)
    }

    async fn drain(&self) {
        self.tracker.close();
        if self.tracker.is_empty() {
            info!("Scheduler stopped");
            return;
        }

        info!(running = self.tracker.len(), "Waiting for in-flight checks");
        if tokio::time::timeout(self.config.drain_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                running = self.tracker.len(),
                "Timed out waiting for in-flight checks"
            );
        }
        info!("Scheduler stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::Error;
    use crate::domain::{NotificationPayload, Platform};
    use crate::ledger::MemoryLedger;
    use crate::monitor::PlatformMonitor;
    use crate::scheduler::TokioClock;

    struct FixedAccounts(Vec<Account>);

    #[async_trait]
    impl AccountSource for FixedAccounts {
        async fn list(&self) -> Result<Vec<Account>> {
            Ok(self.0.clone())
        }
    }

    /// Monitor returning a fixed item per account id.
    #[derive(Default)]
    struct ScriptedMonitor {
        items: HashMap<i64, &'static str>,
        panics_for: Option<i64>,
        delay: Duration,
        calls: Mutex<Vec<(i64, Instant)>>,
    }

    #[async_trait]
    impl PlatformMonitor for ScriptedMonitor {
        fn platform(&self) -> Platform {
            Platform::YouTube
        }

        async fn check(&self, account: &Account) -> Vec<ContentItem> {
            self.calls.lock().push((account.id, Instant::now()));
            if self.panics_for == Some(account.id) {
                panic!("monitor exploded");
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.items
                .get(&account.id)
                .map(|id| ContentItem {
                    id: id.to_string(),
                    url: format!("https://www.youtube.com/watch?v={id}"),
                    title: "title".to_string(),
                    author: "author".to_string(),
                    published_at: None,
                })
                .into_iter()
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        fail_first: usize,
        delay: Duration,
        attempts: Mutex<usize>,
        sent: Mutex<Vec<(String, NotificationPayload)>>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn send(&self, channel_id: &str, payload: &NotificationPayload) -> Result<()> {
            let attempt = {
                let mut attempts = self.attempts.lock();
                *attempts += 1;
                *attempts
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if attempt <= self.fail_first {
                return Err(Error::delivery("channel unavailable"));
            }
            self.sent
                .lock()
                .push((channel_id.to_string(), payload.clone()));
            Ok(())
        }
    }

    /// Formatted log output collected by a thread-local subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        /// Install as the default subscriber for the current thread.
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::WARN)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn account(id: i64) -> Account {
        let mut account = Account::new(
            Platform::YouTube,
            format!("https://www.youtube.com/@acct{id}"),
            format!("chan{id}"),
        );
        account.id = id;
        account
    }

    fn config(interval_ms: u64, spread_ms: u64, initial_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            cycle_interval: Duration::from_millis(interval_ms),
            spread_window: Duration::from_millis(spread_ms),
            initial_delay: Duration::from_millis(initial_ms),
            drain_timeout: Duration::from_secs(60),
        }
    }

    fn scheduler(
        accounts: Vec<Account>,
        monitor: Arc<ScriptedMonitor>,
        ledger: Arc<MemoryLedger>,
        dispatcher: Arc<RecordingDispatcher>,
        config: SchedulerConfig,
    ) -> Arc<Scheduler> {
        let mut registry = MonitorRegistry::new();
        registry.register(monitor);
        Arc::new(Scheduler::new(
            Arc::new(FixedAccounts(accounts)),
            registry,
            ledger,
            dispatcher,
            Arc::new(TokioClock),
            config,
        ))
    }

    /// Run the scheduler on the paused clock for `for_ms`, then stop it.
    async fn run_for(scheduler: Arc<Scheduler>, for_ms: u64) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(for_ms)).await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_staggers_accounts_across_spread_window() {
        let monitor = Arc::new(ScriptedMonitor::default());
        let scheduler = scheduler(
            (1..=5).map(account).collect(),
            monitor.clone(),
            Arc::new(MemoryLedger::new()),
            Arc::new(RecordingDispatcher::default()),
            config(120_000, 60_000, 5_000),
        );

        let start = Instant::now();
        run_for(scheduler, 100_000).await;

        let offsets: Vec<(i64, u128)> = monitor
            .calls
            .lock()
            .iter()
            .map(|(id, at)| (*id, (*at - start).as_millis()))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (1, 5_000),
                (2, 17_000),
                (3, 29_000),
                (4, 41_000),
                (5, 53_000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_repeat_on_interval() {
        let monitor = Arc::new(ScriptedMonitor::default());
        let scheduler = scheduler(
            vec![account(1)],
            monitor.clone(),
            Arc::new(MemoryLedger::new()),
            Arc::new(RecordingDispatcher::default()),
            config(20_000, 60_000, 5_000),
        );

        let start = Instant::now();
        run_for(scheduler, 50_000).await;

        let at: Vec<u128> = monitor
            .calls
            .lock()
            .iter()
            .map(|(_, at)| (*at - start).as_millis())
            .collect();
        assert_eq!(at, vec![5_000, 25_000, 45_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_slot_is_skipped() {
        let monitor = Arc::new(ScriptedMonitor {
            delay: Duration::from_millis(25_000),
            ..Default::default()
        });
        let scheduler = scheduler(
            vec![account(1)],
            monitor.clone(),
            Arc::new(MemoryLedger::new()),
            Arc::new(RecordingDispatcher::default()),
            config(10_000, 0, 0),
        );
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        run_for(scheduler.clone(), 35_000).await;

        // Slots at 0 and 30s ran; 10s and 20s found the first check in flight.
        assert_eq!(monitor.calls.lock().len(), 2);
        assert_eq!(scheduler.skipped_checks(), 2);
        assert_eq!(scheduler.in_flight().in_flight_count(), 0);

        let output = logs.contents();
        let skips: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("Check still in progress, skipping"))
            .collect();
        assert_eq!(skips.len(), 2, "{output}");
        assert!(skips.iter().all(|line| line.contains("WARN") && line.contains("account_id=1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_check_does_not_affect_others() {
        let monitor = Arc::new(ScriptedMonitor {
            items: HashMap::from([(2, "vid2")]),
            panics_for: Some(1),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scheduler = scheduler(
            vec![account(1), account(2)],
            monitor,
            Arc::new(MemoryLedger::new()),
            dispatcher.clone(),
            config(60_000, 0, 0),
        );

        run_for(scheduler.clone(), 1_000).await;

        let sent = dispatcher.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chan2");
        assert_eq!(sent[0].1.url, "https://www.youtube.com/watch?v=vid2");
        assert_eq!(scheduler.in_flight().in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_item_from_concurrent_checks_is_sent_once() {
        let monitor = Arc::new(ScriptedMonitor {
            items: (1..=4).map(|id| (id, "shared")).collect(),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher {
            delay: Duration::from_millis(1_000),
            ..Default::default()
        });
        let ledger = Arc::new(MemoryLedger::new());
        let scheduler = scheduler(
            (1..=4).map(account).collect(),
            monitor.clone(),
            ledger.clone(),
            dispatcher.clone(),
            config(60_000, 0, 0),
        );

        run_for(scheduler, 5_000).await;

        assert_eq!(monitor.calls.lock().len(), 4);
        assert_eq!(dispatcher.sent.lock().len(), 1);
        assert!(ledger.has_seen("shared").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_is_retried_next_cycle() {
        let monitor = Arc::new(ScriptedMonitor {
            items: HashMap::from([(1, "vid")]),
            ..Default::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_first: 1,
            ..Default::default()
        });
        let ledger = Arc::new(MemoryLedger::new());
        let scheduler = scheduler(
            vec![account(1)],
            monitor,
            ledger.clone(),
            dispatcher.clone(),
            config(10_000, 0, 0),
        );

        run_for(scheduler, 25_000).await;

        // Cycle at 0 fails, 10s delivers, 20s finds the id committed.
        assert_eq!(*dispatcher.attempts.lock(), 2);
        assert_eq!(dispatcher.sent.lock().len(), 1);
        assert!(ledger.has_seen("vid").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_account_outcomes() {
        let monitor = Arc::new(ScriptedMonitor {
            items: HashMap::from([(1, "a")]),
            ..Default::default()
        });
        let scheduler = scheduler(
            Vec::new(),
            monitor,
            Arc::new(MemoryLedger::new()),
            Arc::new(RecordingDispatcher::default()),
            SchedulerConfig::default(),
        );

        assert_eq!(
            scheduler.check_account(&account(1)).await,
            CheckOutcome::Done {
                notified: 1,
                failed: 0
            }
        );
        assert_eq!(
            scheduler.check_account(&account(1)).await,
            CheckOutcome::Done {
                notified: 0,
                failed: 0
            }
        );

        let mut unserved = account(3);
        unserved.platform = Platform::Facebook;
        assert_eq!(
            scheduler.check_account(&unserved).await,
            CheckOutcome::Failed
        );
    }

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.cycle_interval, Duration::from_secs(20));
        assert_eq!(config.spread_window, Duration::from_secs(60));
        assert_eq!(config.initial_delay, Duration::from_secs(5));
    }
}
