//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 写入触发器集成测试

use feedcache::metrics::GLOBAL_METRICS;
use feedcache::store::MemoryItemStore;
use feedcache::{Cursor, FallbackReason, FeedCache, FeedHealth, ReadOutcome};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[path = "../common/mod.rs"]
mod common;

use common::GatedStore;

fn config_with_threshold(name: &str, threshold: u64) -> feedcache::FeedCacheConfig {
    let mut config = common::memory_config(name, 100);
    config.refresh_threshold = threshold;
    config
}

fn at_generation(target: u64) -> impl Fn(&FeedHealth) -> bool {
    move |h| h.generation().map_or(false, |g| g >= target)
}

#[tokio::test]
#[serial]
async fn test_threshold_schedules_background_refresh() {
    common::setup_logging();
    let name = common::unique_feed_name("trigger_threshold");

    let store = Arc::new(MemoryItemStore::new(common::items(3)));
    let cache = FeedCache::initialize(config_with_threshold(&name, 3), store.clone())
        .await
        .unwrap();
    let health = cache.coordinator().subscribe_health();

    store.upsert(common::item(4, 40)).await;
    assert!(!cache.on_item_created());
    assert!(!cache.on_item_created());
    assert!(cache.on_item_created());

    assert!(common::wait_for_health(health, Duration::from_secs(5), at_generation(2)).await);
    let page = cache.get(1, Cursor::START).await;
    assert_eq!(common::page_ids(&page), vec![4]);
    assert_eq!(GLOBAL_METRICS.refreshes(&name, "success"), 2);
}

#[tokio::test]
async fn test_disabled_trigger_never_refreshes() {
    common::setup_logging();
    let name = common::unique_feed_name("trigger_disabled");

    let store = Arc::new(GatedStore::new(common::items(2)));
    let cache = FeedCache::initialize(config_with_threshold(&name, 0), store.clone())
        .await
        .unwrap();

    for _ in 0..50 {
        assert!(!cache.on_item_created());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_writer_does_not_wait_for_refresh() {
    common::setup_logging();
    let name = common::unique_feed_name("trigger_nonblocking");

    let store = Arc::new(GatedStore::new(common::items(3)));
    let cache = FeedCache::initialize(config_with_threshold(&name, 1), store.clone())
        .await
        .unwrap();
    let health = cache.coordinator().subscribe_health();

    store.close_gate();
    let started = Instant::now();
    assert!(cache.on_item_created());
    assert!(started.elapsed() < Duration::from_millis(500));

    // 刷新阻塞在数据源查询上，期间读路径回源而不是等待
    store.entered.notified().await;
    let page = cache.get(2, Cursor::START).await;
    assert_eq!(page.outcome, ReadOutcome::Fallback(FallbackReason::Contended));

    store.open_gate();
    assert!(common::wait_for_health(health, Duration::from_secs(5), at_generation(2)).await);
    assert_eq!(cache.get(2, Cursor::START).await.outcome, ReadOutcome::Ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_schedule_once_per_cycle() {
    common::setup_logging();
    let name = common::unique_feed_name("trigger_concurrent");

    let store = Arc::new(MemoryItemStore::new(common::items(5)));
    let cache = Arc::new(
        FeedCache::initialize(config_with_threshold(&name, 25), store)
            .await
            .unwrap(),
    );

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { (0..25).filter(|_| cache.on_item_created()).count() })
        })
        .collect();

    let mut scheduled = 0;
    for task in tasks {
        scheduled += task.await.unwrap();
    }
    assert_eq!(scheduled, 10);
}
