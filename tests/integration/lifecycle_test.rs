//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 生命周期管理集成测试

use feedcache::config::BackendType;
use feedcache::error::FeedError;
use feedcache::store::MemoryItemStore;
use feedcache::{Cursor, FeedCache, FeedHealth, ReadOutcome};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

use common::GatedStore;

#[tokio::test]
async fn test_initialize_serves_first_generation() {
    common::setup_logging();
    let name = common::unique_feed_name("lifecycle_init");

    let cache = FeedCache::initialize(
        common::memory_config(&name, 10),
        Arc::new(MemoryItemStore::new(common::items(3))),
    )
    .await
    .unwrap();

    assert_eq!(cache.name(), name);
    assert!(matches!(cache.health(), FeedHealth::Healthy { generation: 1, .. }));
    assert_eq!(cache.get(10, Cursor::START).await.outcome, ReadOutcome::Ok);
    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    common::setup_logging();

    let mut config = common::memory_config("lifecycle invalid", 10);
    let store = Arc::new(MemoryItemStore::default());
    let result = FeedCache::initialize(config.clone(), store.clone()).await;
    assert!(matches!(result, Err(FeedError::Config(_))));

    config.name = common::unique_feed_name("lifecycle_redis");
    config.backend = BackendType::Redis;
    let result = FeedCache::initialize(config, store).await;
    assert!(matches!(result, Err(FeedError::Config(_))));
}

#[tokio::test]
async fn test_instances_are_isolated() {
    common::setup_logging();

    let first = FeedCache::initialize(
        common::memory_config(&common::unique_feed_name("lifecycle_a"), 10),
        Arc::new(MemoryItemStore::new(vec![common::item(1, 10)])),
    )
    .await
    .unwrap();
    let second = FeedCache::initialize(
        common::memory_config(&common::unique_feed_name("lifecycle_b"), 10),
        Arc::new(MemoryItemStore::new(vec![common::item(2, 20)])),
    )
    .await
    .unwrap();

    assert_eq!(common::read_all(&first, 5).await, vec![1]);
    assert_eq!(common::read_all(&second, 5).await, vec![2]);
}

#[tokio::test]
async fn test_periodic_refresh_runs_until_shutdown() {
    common::setup_logging();
    let name = common::unique_feed_name("lifecycle_periodic");

    let mut config = common::memory_config(&name, 10);
    config.refresh_interval_secs = 1;
    let store = Arc::new(GatedStore::new(common::items(2)));
    let cache = FeedCache::initialize(config, store.clone()).await.unwrap();

    let health = cache.coordinator().subscribe_health();
    assert!(
        common::wait_for_health(health, Duration::from_secs(5), |h| {
            h.generation().map_or(false, |g| g >= 2)
        })
        .await
    );

    cache.shutdown().await.unwrap();
    let calls = store.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(store.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_shutdown_without_periodic_refresh() {
    common::setup_logging();
    let name = common::unique_feed_name("lifecycle_shutdown");

    let cache = FeedCache::initialize(
        common::memory_config(&name, 10),
        Arc::new(MemoryItemStore::default()),
    )
    .await
    .unwrap();

    cache.shutdown().await.unwrap();
    // 重复关闭是安全的
    cache.shutdown().await.unwrap();
}
