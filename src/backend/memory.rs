//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内存后端，条目表基于Moka，索引基于有序集合。

use super::FeedBackend;
use crate::error::Result;
use crate::model::{Cursor, FeedEntry, ItemId};
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

// 值: (数据, 过期时间点)
type ItemValue = (Vec<u8>, Instant);

/// 按条目自身的过期时间点驱逐
struct ItemExpiry;

impl Expiry<ItemId, ItemValue> for ItemExpiry {
    fn expire_after_create(
        &self,
        _key: &ItemId,
        value: &ItemValue,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &ItemId,
        value: &ItemValue,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1.saturating_duration_since(updated_at))
    }
}

/// 内存后端实现
#[derive(Clone)]
pub struct MemoryFeedBackend {
    /// (score, member) 升序集合，读取时反向遍历
    index: Arc<RwLock<BTreeSet<(i64, ItemId)>>>,
    items: Cache<ItemId, ItemValue>,
}

impl MemoryFeedBackend {
    /// 创建新的内存后端
    ///
    /// # 参数
    ///
    /// * `capacity` - 条目表最大容量（条目数）
    ///
    /// 条目表使用LRU驱逐：新一代的快照总是被接纳，旧一代的热点快照不会挤掉它们。
    pub fn new(capacity: u64) -> Self {
        Self {
            index: Arc::new(RwLock::new(BTreeSet::new())),
            items: Cache::builder()
                .max_capacity(capacity)
                .eviction_policy(EvictionPolicy::lru())
                .expire_after(ItemExpiry)
                .build(),
        }
    }

    /// 删除单个条目快照，索引不受影响
    pub async fn evict_item(&self, id: ItemId) {
        self.items.remove(&id).await;
    }
}

#[async_trait]
impl FeedBackend for MemoryFeedBackend {
    #[instrument(skip(self, body), level = "debug", fields(body_len = body.len()))]
    async fn put_item(&self, id: ItemId, body: Vec<u8>, ttl: Duration) -> Result<()> {
        self.items.insert(id, (body, Instant::now() + ttl)).await;
        Ok(())
    }

    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn replace_index(&self, entries: &[FeedEntry]) -> Result<()> {
        // member唯一，重复时以后出现的score为准
        let latest: HashMap<ItemId, i64> = entries.iter().map(|e| (e.member, e.score)).collect();

        let mut index = self.index.write().await;
        // 上一代中不再被索引的条目快照立即释放，把容量留给下一代
        let retired: Vec<ItemId> = index
            .iter()
            .map(|&(_, member)| member)
            .filter(|member| !latest.contains_key(member))
            .collect();
        for member in &retired {
            self.items.invalidate(member).await;
        }
        self.items.run_pending_tasks().await;

        index.clear();
        index.extend(latest.into_iter().map(|(member, score)| (score, member)));
        debug!(
            "Memory index replaced: size={}, retired={}",
            index.len(),
            retired.len()
        );
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn range_below(&self, cursor: Cursor, count: usize) -> Result<Vec<FeedEntry>> {
        let index = self.index.read().await;
        let entries: Vec<FeedEntry> = match cursor.upper_bound() {
            Some(bound) => index
                .range(..(bound, ItemId::MIN))
                .rev()
                .take(count)
                .map(|&(score, member)| FeedEntry::new(score, member))
                .collect(),
            None => index
                .iter()
                .rev()
                .take(count)
                .map(|&(score, member)| FeedEntry::new(score, member))
                .collect(),
        };
        Ok(entries)
    }

    #[instrument(skip(self, ids), level = "debug", fields(id_count = ids.len()))]
    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Vec<u8>>>> {
        let now = Instant::now();
        let mut bodies = Vec::with_capacity(ids.len());
        for id in ids {
            let body = match self.items.get(id).await {
                Some((bytes, expire_at)) if expire_at > now => Some(bytes),
                Some(_) => {
                    debug!("Memory get_items: id={}, expired=true", id);
                    None
                }
                None => None,
            };
            bodies.push(body);
        }
        Ok(bodies)
    }

    async fn index_len(&self) -> Result<usize> {
        Ok(self.index.read().await.len())
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<()> {
        self.index.write().await.clear();
        self.items.invalidate_all();
        debug!("Memory backend cleared");
        Ok(())
    }
}
