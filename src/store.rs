//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 数据源接口
//!
//! Feed缓存只从数据源消费一个读操作：取最近更新的N个活跃、未过期条目。

use crate::error::Result;
use crate::model::{Item, ItemStatus};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

/// 数据源特征
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// 按最后更新时间降序返回最多 `limit` 个活跃且未过期的条目
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Item>>;
}

/// 进程内数据源
///
/// 持有一组条目，查询时按活跃状态和过期时间过滤。用于测试、基准和本地演示。
#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// 新增或替换（按ID）一个条目
    pub async fn upsert(&self, item: Item) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub async fn remove(&self, id: i64) {
        self.items.write().await.retain(|i| i.id != id);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Item>> {
        let now = Utc::now();
        let items = self.items.read().await;
        let mut active: Vec<Item> = items
            .iter()
            .filter(|i| i.status == ItemStatus::Active && i.expires_at > now)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        active.truncate(limit);
        Ok(active)
    }
}
