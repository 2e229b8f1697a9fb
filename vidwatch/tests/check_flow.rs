//! End-to-end checks against the SQLite stores.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use vidwatch::database::repositories::{AccountRepository, SqlxAccountRepository};
use vidwatch::database::{DbPool, init_pool, run_migrations};
use vidwatch::domain::{Account, ContentItem, NotificationPayload, Platform};
use vidwatch::ledger::{DedupLedger, SqlxDedupLedger};
use vidwatch::monitor::{MonitorRegistry, PlatformMonitor};
use vidwatch::notification::NotificationDispatcher;
use vidwatch::scheduler::{AccountSource, CheckOutcome, Scheduler, SchedulerConfig, TokioClock};
use vidwatch::{Error, Result};

/// Monitor whose current feed head can be swapped between checks.
struct SwitchableFeed {
    platform: Platform,
    head: Mutex<Vec<ContentItem>>,
}

impl SwitchableFeed {
    fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            head: Mutex::new(Vec::new()),
        })
    }

    fn publish(&self, id: &str) {
        *self.head.lock() = vec![ContentItem {
            id: id.to_string(),
            url: format!("https://www.tiktok.com/@dancer/video/{id}"),
            title: String::new(),
            author: "dancer".to_string(),
            published_at: None,
        }];
    }
}

#[async_trait]
impl PlatformMonitor for SwitchableFeed {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check(&self, _account: &Account) -> Vec<ContentItem> {
        self.head.lock().clone()
    }
}

#[derive(Default)]
struct Outbox {
    down: Mutex<bool>,
    messages: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationDispatcher for Outbox {
    async fn send(&self, channel_id: &str, payload: &NotificationPayload) -> Result<()> {
        if *self.down.lock() {
            return Err(Error::delivery("gateway unavailable"));
        }
        self.messages
            .lock()
            .push((channel_id.to_string(), payload.render()));
        Ok(())
    }
}

async fn pool() -> DbPool {
    let pool = init_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn build_scheduler(
    pool: &DbPool,
    feed: Arc<SwitchableFeed>,
    outbox: Arc<Outbox>,
) -> Scheduler {
    let mut monitors = MonitorRegistry::new();
    monitors.register(feed);
    Scheduler::new(
        Arc::new(SqlxAccountRepository::new(pool.clone())),
        monitors,
        Arc::new(SqlxDedupLedger::new(pool.clone())),
        outbox,
        Arc::new(TokioClock),
        SchedulerConfig::default(),
    )
}

#[tokio::test]
async fn new_upload_is_announced_once_and_persisted() {
    let pool = pool().await;
    let repo = SqlxAccountRepository::new(pool.clone());
    let account = repo
        .create_account(&Account::new(
            Platform::TikTok,
            "https://www.tiktok.com/@dancer",
            "555",
        ))
        .await
        .unwrap();

    let feed = SwitchableFeed::new(Platform::TikTok);
    let outbox = Arc::new(Outbox::default());
    let scheduler = build_scheduler(&pool, feed.clone(), outbox.clone());

    // Nothing published yet.
    assert_eq!(
        scheduler.check_account(&account).await,
        CheckOutcome::Done {
            notified: 0,
            failed: 0
        }
    );

    feed.publish("7001");
    scheduler.check_account(&account).await;
    scheduler.check_account(&account).await;

    {
        let messages = outbox.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "555");
        assert_eq!(
            messages[0].1,
            "**New Upload!** \u{1F3A5}\n**Author:** dancer\n**Title:** No Title\n**Link:** https://www.tiktok.com/@dancer/video/7001"
        );
    }

    // A restarted process sees the persisted record.
    let restarted = build_scheduler(&pool, feed.clone(), outbox.clone());
    restarted.check_account(&account).await;
    assert_eq!(outbox.messages.lock().len(), 1);

    feed.publish("7002");
    restarted.check_account(&account).await;
    assert_eq!(outbox.messages.lock().len(), 2);
}

#[tokio::test]
async fn failed_delivery_leaves_item_eligible() {
    let pool = pool().await;
    let repo = SqlxAccountRepository::new(pool.clone());
    let account = repo
        .create_account(&Account::new(
            Platform::TikTok,
            "https://www.tiktok.com/@dancer",
            "555",
        ))
        .await
        .unwrap();

    let feed = SwitchableFeed::new(Platform::TikTok);
    feed.publish("9001");
    let outbox = Arc::new(Outbox::default());
    *outbox.down.lock() = true;
    let scheduler = build_scheduler(&pool, feed, outbox.clone());
    let ledger = SqlxDedupLedger::new(pool.clone());

    assert_eq!(
        scheduler.check_account(&account).await,
        CheckOutcome::Done {
            notified: 0,
            failed: 1
        }
    );
    assert!(!ledger.has_seen("9001").await.unwrap());

    *outbox.down.lock() = false;
    assert_eq!(
        scheduler.check_account(&account).await,
        CheckOutcome::Done {
            notified: 1,
            failed: 0
        }
    );
    assert!(ledger.has_seen("9001").await.unwrap());
    assert!(ledger.get_record("9001").await.unwrap().is_some());
}

#[tokio::test]
async fn stored_accounts_feed_the_scheduler_in_id_order() {
    let pool = pool().await;
    let repo = SqlxAccountRepository::new(pool.clone());
    for (platform, url) in [
        (Platform::YouTube, "https://www.youtube.com/channel/UC1"),
        (Platform::Instagram, "https://www.instagram.com/cook"),
        (Platform::Facebook, "https://www.facebook.com/page"),
    ] {
        repo.create_account(&Account::new(platform, url, "1"))
            .await
            .unwrap();
    }

    let accounts = AccountSource::list(&repo).await.unwrap();
    let platforms: Vec<Platform> = accounts.iter().map(|a| a.platform).collect();
    assert_eq!(
        platforms,
        vec![Platform::YouTube, Platform::Instagram, Platform::Facebook]
    );
    assert!(accounts.windows(2).all(|w| w[0].id < w[1].id));
}
