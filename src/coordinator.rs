//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了刷新协调器。
//!
//! 协调器持有当前一代 (FeedIndex, ItemCacheTable) 的读写权：
//! - [`RefreshCoordinator::refresh`] 获取独占锁，从数据源重建整代数据
//! - [`RefreshCoordinator::try_read`] 非阻塞地获取共享锁，刷新进行中时立即返回None
//!
//! 清空索引和批量写入都在独占锁内完成，读者不会看到半清空的索引。

use crate::backend::FeedBackend;
use crate::config::FeedCacheConfig;
use crate::error::{FeedError, Result};
use crate::health::FeedHealth;
use crate::metrics::GLOBAL_METRICS;
use crate::model::{FeedEntry, Item, ItemStatus};
use crate::serialization::SerializerEnum;
use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock, RwLockReadGuard};
use tracing::{debug, error, info, instrument, warn};

/// 当前一代数据的元信息
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// 代号，每次成功刷新加一，0表示尚未刷新
    pub number: u64,
    /// 索引中的条目数
    pub size: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// 一次成功刷新的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub generation: u64,
    /// 写入索引的条目数
    pub loaded: usize,
    /// 因过期、非活跃、序列化或写入失败被跳过的条目数
    pub skipped: usize,
    pub elapsed: Duration,
}

/// 条目被跳过的原因
enum SkipReason {
    Inactive,
    Expired,
    NonPositiveScore(i64),
    Serialization(FeedError),
    Persist(FeedError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Inactive => write!(f, "item is not active"),
            SkipReason::Expired => write!(f, "item already expired"),
            SkipReason::NonPositiveScore(score) => write!(f, "score {} is not positive", score),
            SkipReason::Serialization(e) => write!(f, "serialization failed: {}", e),
            SkipReason::Persist(e) => write!(f, "persist failed: {}", e),
        }
    }
}

/// 共享访问令牌
///
/// 持有期间刷新无法开始；drop 后释放。
pub struct ReadGuard<'a> {
    generation: RwLockReadGuard<'a, Generation>,
    backend: &'a dyn FeedBackend,
    health: FeedHealth,
}

impl<'a> ReadGuard<'a> {
    pub fn generation(&self) -> u64 {
        self.generation.number
    }

    pub fn backend(&self) -> &'a dyn FeedBackend {
        self.backend
    }

    /// 获取令牌时的健康状态
    pub fn health(&self) -> FeedHealth {
        self.health
    }
}

/// 刷新协调器
pub struct RefreshCoordinator {
    name: String,
    store: Arc<dyn ItemStore>,
    backend: Arc<dyn FeedBackend>,
    serializer: SerializerEnum,
    load_limit: usize,
    max_consecutive_failures: u32,
    generation: RwLock<Generation>,
    health: watch::Sender<FeedHealth>,
}

impl RefreshCoordinator {
    /// 创建新的刷新协调器
    ///
    /// # 参数
    ///
    /// * `name` - Feed名称
    /// * `store` - 数据源
    /// * `backend` - 缓存后端
    /// * `serializer` - 序列化器
    /// * `load_limit` - 每代最多加载的条目数
    /// * `max_consecutive_failures` - 连续失败升级阈值，0表示永不升级
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn ItemStore>,
        backend: Arc<dyn FeedBackend>,
        serializer: SerializerEnum,
        load_limit: usize,
        max_consecutive_failures: u32,
    ) -> Self {
        let (health, _) = watch::channel(FeedHealth::Uninitialized);
        Self {
            name: name.into(),
            store,
            backend,
            serializer,
            load_limit,
            max_consecutive_failures,
            generation: RwLock::new(Generation::default()),
            health,
        }
    }

    /// 根据配置创建刷新协调器
    pub fn from_config(
        config: &FeedCacheConfig,
        store: Arc<dyn ItemStore>,
        backend: Arc<dyn FeedBackend>,
    ) -> Self {
        Self::new(
            config.name.clone(),
            store,
            backend,
            SerializerEnum::from_config(&config.serialization, config.compress),
            config.load_limit,
            config.max_consecutive_failures,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serializer(&self) -> &SerializerEnum {
        &self.serializer
    }

    pub fn backend(&self) -> &Arc<dyn FeedBackend> {
        &self.backend
    }

    pub fn health(&self) -> FeedHealth {
        *self.health.borrow()
    }

    /// 订阅健康状态变化
    pub fn subscribe_health(&self) -> watch::Receiver<FeedHealth> {
        self.health.subscribe()
    }

    /// 尝试非阻塞地获取共享访问令牌
    ///
    /// 刷新进行中（或已有刷新在排队）时立即返回None，从不等待。
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        let generation = self.generation.try_read().ok()?;
        Some(ReadGuard {
            generation,
            backend: self.backend.as_ref(),
            health: *self.health.borrow(),
        })
    }

    /// 从数据源重建整代数据
    ///
    /// 查询失败时不修改任何现有数据，上一代继续生效；
    /// 单个条目序列化或写入失败时跳过该条目，刷新继续。
    #[instrument(skip(self), level = "info", fields(feed = %self.name))]
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let mut generation = self.generation.write().await;
        let started = Instant::now();

        let items = match self.store.fetch_recent(self.load_limit).await {
            Ok(items) => items,
            Err(e) => {
                let e = match e {
                    FeedError::Source(_) => e,
                    other => FeedError::Source(other.to_string()),
                };
                self.record_failure(started, &e);
                return Err(e);
            }
        };

        let now = Utc::now();
        let mut entries = Vec::with_capacity(items.len().min(self.load_limit));
        let mut skipped = 0usize;
        for item in items.iter().take(self.load_limit) {
            match self.persist(item, now).await {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    skipped += 1;
                    warn!("Skipping item {} during refresh: {}", item.id, reason);
                }
            }
        }

        if let Err(e) = self.backend.replace_index(&entries).await {
            self.record_failure(started, &e);
            return Err(e);
        }

        generation.number += 1;
        generation.size = entries.len();
        generation.refreshed_at = Some(now);

        let elapsed = started.elapsed();
        GLOBAL_METRICS.record_refresh(&self.name, "success", elapsed.as_secs_f64());
        GLOBAL_METRICS.set_generation_size(&self.name, entries.len(), skipped);
        GLOBAL_METRICS.set_health(&self.name, 1);
        self.health
            .send_replace(FeedHealth::after_success(generation.number, now));
        info!(
            "Feed {} refreshed: generation={}, loaded={}, skipped={}, elapsed={:?}",
            self.name,
            generation.number,
            entries.len(),
            skipped,
            elapsed
        );

        Ok(RefreshReport {
            generation: generation.number,
            loaded: entries.len(),
            skipped,
            elapsed,
        })
    }

    async fn persist(
        &self,
        item: &Item,
        now: DateTime<Utc>,
    ) -> std::result::Result<FeedEntry, SkipReason> {
        if item.status != ItemStatus::Active {
            return Err(SkipReason::Inactive);
        }
        // score 0 是首页游标，非正score会让分页回到开头
        let score = item.score();
        if score <= 0 {
            return Err(SkipReason::NonPositiveScore(score));
        }
        // 条目表TTL等于剩余存活时间，保证缓存不会比数据源活得更久
        let ttl = item.time_to_expiry(now).ok_or(SkipReason::Expired)?;
        let body = self
            .serializer
            .encode_item(item)
            .map_err(SkipReason::Serialization)?;
        self.backend
            .put_item(item.id, body, ttl)
            .await
            .map_err(SkipReason::Persist)?;
        debug!("Cached item {} with ttl {:?}", item.id, ttl);
        Ok(FeedEntry::new(score, item.id))
    }

    fn record_failure(&self, started: Instant, err: &FeedError) {
        let next = self
            .health
            .borrow()
            .after_failure(Utc::now(), self.max_consecutive_failures);
        GLOBAL_METRICS.record_refresh(&self.name, "failure", started.elapsed().as_secs_f64());
        GLOBAL_METRICS.set_health(&self.name, next.status_code());
        self.health.send_replace(next);

        if next.is_escalated() {
            error!(
                "Feed {} refresh failed {} times in a row, serving from source only: {}",
                self.name,
                next.failure_count(),
                err
            );
        } else {
            warn!(
                "Feed {} refresh failed, keeping previous generation: {}",
                self.name, err
            );
        }
    }
}
