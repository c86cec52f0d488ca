//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存的存储后端。
//!
//! 一个后端同时承载两部分数据：
//! - FeedIndex：以更新时间为score、条目ID为member的有序索引
//! - ItemCacheTable：条目ID到序列化快照的映射，每个键带独立TTL
//!
//! 后端本身不保证"清空索引+批量写入"的原子性，
//! 读者可见的原子性由 [`crate::coordinator::RefreshCoordinator`] 的独占锁提供。

pub mod memory;
pub mod remote;
pub mod redis_provider;

use crate::config::{BackendType, FeedCacheConfig};
use crate::error::{FeedError, Result};
use crate::model::{Cursor, FeedEntry, ItemId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use self::memory::MemoryFeedBackend;
pub use self::remote::RedisFeedBackend;

/// Feed缓存后端特征
#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// 写入一个条目快照，TTL为条目剩余存活时间
    async fn put_item(&self, id: ItemId, body: Vec<u8>, ttl: Duration) -> Result<()>;

    /// 用给定条目整体替换索引内容（先清空再批量写入）
    async fn replace_index(&self, entries: &[FeedEntry]) -> Result<()>;

    /// 按score降序取最多 `count` 个 score 严格小于游标的索引条目
    async fn range_below(&self, cursor: Cursor, count: usize) -> Result<Vec<FeedEntry>>;

    /// 批量获取条目快照，结果与 `ids` 一一对应，缺失为None
    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Vec<u8>>>>;

    /// 索引中的条目数
    async fn index_len(&self) -> Result<usize>;

    /// 删除索引和所有条目
    async fn clear(&self) -> Result<()>;

    /// 检查后端是否可用
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// 后端键方案
///
/// 索引键为 `{name}:index`，条目键为 `{name}:item:{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    name: String,
}

impl KeySpace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_key(&self) -> String {
        format!("{}:index", self.name)
    }

    pub fn item_key(&self, id: ItemId) -> String {
        format!("{}:item:{}", self.name, id)
    }

    /// 匹配所有条目键的模式，用于SCAN
    pub fn item_pattern(&self) -> String {
        format!("{}:item:*", self.name)
    }
}

/// 根据配置创建后端
pub async fn build_backend(config: &FeedCacheConfig) -> Result<Arc<dyn FeedBackend>> {
    let keys = KeySpace::new(config.name.clone());
    match config.backend {
        BackendType::Memory => Ok(Arc::new(MemoryFeedBackend::new(config.memory.max_capacity))),
        BackendType::Redis => {
            let redis_cfg = config.redis.as_ref().ok_or_else(|| {
                FeedError::Config("redis backend selected but [redis] is missing".to_string())
            })?;
            Ok(Arc::new(RedisFeedBackend::new(redis_cfg, keys).await?))
        }
    }
}
