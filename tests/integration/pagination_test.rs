//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 游标分页集成测试

use chrono::Duration as ChronoDuration;
use feedcache::metrics::{get_metrics_string, GLOBAL_METRICS};
use feedcache::store::MemoryItemStore;
use feedcache::{Cursor, FallbackReason, FeedCache, ReadOutcome};
use serial_test::serial;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;

use common::FlakyBackend;

async fn cache_with(name: &str, load_limit: usize, items: Vec<feedcache::Item>) -> FeedCache {
    common::setup_logging();
    FeedCache::initialize(
        common::memory_config(name, load_limit),
        Arc::new(MemoryItemStore::new(items)),
    )
    .await
    .unwrap()
}

/// 加载上限为3时，A(30) B(20) C(10) D(5) 中只有前三个进入Feed
#[tokio::test]
async fn test_walkthrough_with_load_limit() {
    let name = common::unique_feed_name("page_walkthrough");
    let items = vec![
        common::item(1, 30),
        common::item(2, 20),
        common::item(3, 10),
        common::item(4, 5),
    ];
    let cache = cache_with(&name, 3, items).await;

    let first = cache.get(2, Cursor::START).await;
    assert_eq!(common::page_ids(&first), vec![1, 2]);
    assert_eq!(first.next_cursor, Cursor::new(20));
    assert_eq!(first.outcome, ReadOutcome::Ok);

    let second = cache.get(2, Cursor::new(20)).await;
    assert_eq!(common::page_ids(&second), vec![3]);
    assert_eq!(second.next_cursor, Cursor::new(10));
    assert_eq!(second.outcome, ReadOutcome::Ok);

    let third = cache.get(2, Cursor::new(10)).await;
    assert!(third.items.is_empty());
    assert_eq!(third.next_cursor, Cursor::new(10));
    assert_eq!(
        third.outcome,
        ReadOutcome::Fallback(FallbackReason::Exhausted)
    );
}

#[tokio::test]
async fn test_pages_cover_feed_without_duplicates() {
    let name = common::unique_feed_name("page_cover");
    let cache = cache_with(&name, 100, common::items(50)).await;

    let ids = common::read_all(&cache, 7).await;
    let expected: Vec<i64> = (1..=50).rev().collect();
    assert_eq!(ids, expected);

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_items_within_page_are_descending() {
    let name = common::unique_feed_name("page_order");
    let items = vec![
        common::item(1, 500),
        common::item(2, 100),
        common::item(3, 900),
        common::item(4, 300),
    ];
    let cache = cache_with(&name, 10, items).await;

    let page = cache.get(10, Cursor::START).await;
    let scores: Vec<i64> = page.items.iter().map(|i| i.score()).collect();
    assert_eq!(scores, vec![900, 500, 300, 100]);
    assert_eq!(page.next_cursor, Cursor::new(100));
}

#[tokio::test]
async fn test_cursor_survives_newer_items() {
    let name = common::unique_feed_name("page_insert");
    let store = Arc::new(MemoryItemStore::new(common::items(6)));
    let cache = FeedCache::initialize(common::memory_config(&name, 100), store.clone())
        .await
        .unwrap();

    let first = cache.get(3, Cursor::START).await;
    assert_eq!(common::page_ids(&first), vec![6, 5, 4]);

    // 第一页之后有更新的条目进入，游标基于score，不会产生重复
    store.upsert(common::item(7, 70)).await;
    store.upsert(common::item(8, 80)).await;
    cache.refresh().await.unwrap();

    let second = cache.get(3, first.next_cursor).await;
    assert_eq!(common::page_ids(&second), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_zero_count_returns_empty_ok() {
    let name = common::unique_feed_name("page_zero");
    let cache = cache_with(&name, 10, common::items(3)).await;

    let page = cache.get(0, Cursor::new(25)).await;
    assert!(page.items.is_empty());
    assert_eq!(page.next_cursor, Cursor::new(25));
    assert_eq!(page.outcome, ReadOutcome::Ok);
}

#[tokio::test]
async fn test_empty_feed_falls_back() {
    let name = common::unique_feed_name("page_empty");
    let cache = cache_with(&name, 10, Vec::new()).await;

    let page = cache.get(5, Cursor::START).await;
    assert!(page.items.is_empty());
    assert_eq!(page.next_cursor, Cursor::START);
    assert_eq!(
        page.outcome,
        ReadOutcome::Fallback(FallbackReason::Exhausted)
    );
}

#[tokio::test]
async fn test_expired_items_are_not_served() {
    let name = common::unique_feed_name("page_expiry");
    let items = vec![
        common::item(1, 30),
        common::item_expiring_in(2, 20, ChronoDuration::milliseconds(800)),
        common::item(3, 10),
    ];
    let cache = cache_with(&name, 10, items).await;
    assert_eq!(common::read_all(&cache, 10).await, vec![1, 2, 3]);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    // 索引仍然包含条目2，但条目体已过期，分页进度不受影响
    let page = cache.get(2, Cursor::START).await;
    assert_eq!(common::page_ids(&page), vec![1]);
    assert_eq!(page.next_cursor, Cursor::new(20));
    assert_eq!(page.outcome, ReadOutcome::Ok);
}

#[tokio::test]
async fn test_backend_failure_falls_back() {
    let name = common::unique_feed_name("page_backend");
    let backend = Arc::new(FlakyBackend::new());
    let cache = FeedCache::with_backend(
        common::memory_config(&name, 10),
        Arc::new(MemoryItemStore::new(common::items(3))),
        backend.clone(),
    )
    .await
    .unwrap();

    backend.fail_ranges(true);
    let page = cache.get(2, Cursor::new(30)).await;
    assert_eq!(page.outcome, ReadOutcome::Fallback(FallbackReason::Backend));
    assert_eq!(page.next_cursor, Cursor::new(30));

    backend.fail_ranges(false);
    assert_eq!(cache.get(2, Cursor::new(30)).await.outcome, ReadOutcome::Ok);
}

#[tokio::test]
#[serial]
async fn test_reads_are_counted_by_outcome() {
    let name = common::unique_feed_name("page_metrics");
    let cache = cache_with(&name, 10, common::items(2)).await;

    cache.get(5, Cursor::START).await;
    cache.get(5, Cursor::new(10)).await;
    cache.get(5, Cursor::new(10)).await;

    assert_eq!(GLOBAL_METRICS.reads(&name, "ok"), 1);
    assert_eq!(GLOBAL_METRICS.reads(&name, "fallback:exhausted"), 2);

    let output = get_metrics_string();
    assert!(output.contains(&format!(
        "feed_reads_total{{feed=\"{}\", outcome=\"ok\"}} 1",
        name
    )));
    assert!(output.contains(&format!("feed_index_size{{feed=\"{}\"}} 2", name)));
}

/// 条目表容量等于加载上限时，连续两次整代替换后每个索引条目都能读到
#[tokio::test]
async fn test_full_replacement_at_capacity_serves_every_entry() {
    common::setup_logging();
    let name = common::unique_feed_name("page_capacity_swap");
    let mut config = common::memory_config(&name, 50);
    config.memory.max_capacity = 50;

    let store = Arc::new(MemoryItemStore::new(common::items(50)));
    let cache = FeedCache::initialize(config, store.clone()).await.unwrap();

    for generation in 1..=2i64 {
        for _ in 0..20 {
            let page = cache.get(50, Cursor::START).await;
            assert_eq!(page.outcome, ReadOutcome::Ok);
        }

        let previous = (generation - 1) * 50;
        for id in previous + 1..=previous + 50 {
            store.remove(id).await;
        }
        for id in previous + 51..=previous + 100 {
            store.upsert(common::item(id, id * 10)).await;
        }
        cache.refresh().await.unwrap();

        let page = cache.get(50, Cursor::START).await;
        assert_eq!(page.outcome, ReadOutcome::Ok);
        assert_eq!(page.items.len(), 50, "generation {} lost bodies", generation);
        let ids: HashSet<i64> = common::page_ids(&page).into_iter().collect();
        let expected: HashSet<i64> = (previous + 51..=previous + 100).collect();
        assert_eq!(ids, expected);
    }
}
