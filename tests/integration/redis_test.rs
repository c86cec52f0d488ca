//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis后端集成测试，Redis不可用时跳过

use feedcache::backend::{FeedBackend, KeySpace, RedisFeedBackend};
use feedcache::config::{BackendType, RedisConfig};
use feedcache::model::{Cursor, FeedEntry};
use feedcache::store::MemoryItemStore;
use feedcache::{FeedCache, ReadOutcome};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

fn redis_config() -> RedisConfig {
    RedisConfig {
        connection_string: SecretString::new(common::redis_url().into()),
        ..Default::default()
    }
}

async fn backend(name: &str) -> RedisFeedBackend {
    RedisFeedBackend::new(&redis_config(), KeySpace::new(name))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_index_range_queries() {
    common::setup_logging();
    if !common::is_redis_available().await {
        println!("Skipping test_index_range_queries because Redis is not available");
        return;
    }

    let name = common::unique_feed_name("redis_range");
    let backend = backend(&name).await;
    backend
        .replace_index(&[
            FeedEntry::new(30, 1),
            FeedEntry::new(20, 2),
            FeedEntry::new(10, 3),
        ])
        .await
        .unwrap();

    let first = backend.range_below(Cursor::START, 2).await.unwrap();
    assert_eq!(first, vec![FeedEntry::new(30, 1), FeedEntry::new(20, 2)]);

    let next = backend.range_below(Cursor::new(20), 2).await.unwrap();
    assert_eq!(next, vec![FeedEntry::new(10, 3)]);
    assert!(backend.range_below(Cursor::new(10), 2).await.unwrap().is_empty());

    // 替换索引会丢弃上一代的全部成员
    backend
        .replace_index(&[FeedEntry::new(40, 4)])
        .await
        .unwrap();
    assert_eq!(backend.index_len().await.unwrap(), 1);

    backend.clear().await.unwrap();
    assert_eq!(backend.index_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_item_bodies_expire() {
    common::setup_logging();
    if !common::is_redis_available().await {
        println!("Skipping test_item_bodies_expire because Redis is not available");
        return;
    }

    let name = common::unique_feed_name("redis_ttl");
    let backend = backend(&name).await;
    backend
        .put_item(1, b"first".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();
    backend
        .put_item(2, b"second".to_vec(), Duration::from_millis(200))
        .await
        .unwrap();

    let bodies = backend.get_items(&[1, 2, 3]).await.unwrap();
    assert_eq!(bodies[0].as_deref(), Some(&b"first"[..]));
    assert_eq!(bodies[1].as_deref(), Some(&b"second"[..]));
    assert_eq!(bodies[2], None);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let bodies = backend.get_items(&[1, 2]).await.unwrap();
    assert!(bodies[0].is_some());
    assert!(bodies[1].is_none());

    backend.clear().await.unwrap();
    assert_eq!(backend.get_items(&[1]).await.unwrap(), vec![None]);
}

#[tokio::test]
async fn test_feed_cache_over_redis() {
    common::setup_logging();
    if !common::is_redis_available().await {
        println!("Skipping test_feed_cache_over_redis because Redis is not available");
        return;
    }

    let name = common::unique_feed_name("redis_feed");
    let mut config = common::memory_config(&name, 3);
    config.backend = BackendType::Redis;
    config.redis = Some(redis_config());

    let store = Arc::new(MemoryItemStore::new(vec![
        common::item(1, 30),
        common::item(2, 20),
        common::item(3, 10),
        common::item(4, 5),
    ]));
    let cache = FeedCache::initialize(config, store).await.unwrap();

    let first = cache.get(2, Cursor::START).await;
    assert_eq!(common::page_ids(&first), vec![1, 2]);
    assert_eq!(first.next_cursor, Cursor::new(20));

    let second = cache.get(2, first.next_cursor).await;
    assert_eq!(common::page_ids(&second), vec![3]);

    let third = cache.get(2, second.next_cursor).await;
    assert!(third.outcome.is_fallback());
    assert_ne!(third.outcome, ReadOutcome::Ok);

    cache.coordinator().backend().clear().await.unwrap();
    cache.shutdown().await.unwrap();
}
