//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存门面，负责初始化、组装和关闭各个组件。

use crate::backend::{build_backend, FeedBackend};
use crate::config::FeedCacheConfig;
use crate::coordinator::{RefreshCoordinator, RefreshReport};
use crate::error::{FeedError, Result};
use crate::health::FeedHealth;
use crate::model::Cursor;
use crate::reader::{FeedPage, FeedReader};
use crate::store::ItemStore;
use crate::trigger::WriteTrigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Feed缓存
///
/// 每个实例独立持有自己的一代数据，不存在全局单例，测试可以并行构造多个实例。
pub struct FeedCache {
    config: FeedCacheConfig,
    coordinator: Arc<RefreshCoordinator>,
    reader: FeedReader,
    trigger: WriteTrigger,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedCache {
    /// 初始化Feed缓存
    ///
    /// 校验配置、按配置构建后端，并同步完成第一次刷新。
    /// 第一次刷新失败时初始化失败，不会返回一个空缓存。
    ///
    /// # 参数
    ///
    /// * `config` - Feed缓存配置
    /// * `store` - 数据源
    #[instrument(skip(config, store), level = "info", fields(feed = %config.name))]
    pub async fn initialize(config: FeedCacheConfig, store: Arc<dyn ItemStore>) -> Result<Self> {
        config.validate().map_err(FeedError::Config)?;
        let backend = build_backend(&config).await?;
        Self::with_backend(config, store, backend).await
    }

    /// 使用已构建的后端初始化Feed缓存
    #[instrument(skip(config, store, backend), level = "info", fields(feed = %config.name))]
    pub async fn with_backend(
        config: FeedCacheConfig,
        store: Arc<dyn ItemStore>,
        backend: Arc<dyn FeedBackend>,
    ) -> Result<Self> {
        config.validate().map_err(FeedError::Config)?;

        let coordinator = Arc::new(RefreshCoordinator::from_config(&config, store, backend));
        let report = coordinator.refresh().await.map_err(|e| {
            FeedError::Initialization(format!(
                "initial refresh of feed {} failed: {}",
                config.name, e
            ))
        })?;
        info!(
            "Feed {} initialized with {} items (generation {})",
            config.name, report.loaded, report.generation
        );

        let reader = FeedReader::new(coordinator.clone());
        let trigger = WriteTrigger::new(config.refresh_threshold, coordinator.clone());
        let refresh_task = spawn_periodic_refresh(&config, &coordinator);

        Ok(Self {
            config,
            coordinator,
            reader,
            trigger,
            refresh_task: Mutex::new(refresh_task),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &FeedCacheConfig {
        &self.config
    }

    /// 读取一页，见 [`FeedReader::get`]
    pub async fn get(&self, count: usize, cursor: Cursor) -> FeedPage {
        self.reader.get(count, cursor).await
    }

    /// 通知缓存有新条目创建
    ///
    /// 返回本次调用是否调度了一次后台刷新。
    pub fn on_item_created(&self) -> bool {
        self.trigger.increment()
    }

    /// 立即执行一次刷新，等待其完成
    pub async fn refresh(&self) -> Result<RefreshReport> {
        self.coordinator.refresh().await
    }

    pub fn health(&self) -> FeedHealth {
        self.coordinator.health()
    }

    pub fn reader(&self) -> &FeedReader {
        &self.reader
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// 关闭Feed缓存
    ///
    /// 停止周期刷新任务。已由写入触发器调度的刷新会自然完成。
    #[instrument(skip(self), level = "info", fields(feed = %self.config.name))]
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.refresh_task.lock().await.take() {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!("Periodic refresh task of feed {} ended abnormally: {}", self.config.name, e),
            }
        }
        info!("Feed {} shut down", self.config.name);
        Ok(())
    }
}

impl Drop for FeedCache {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_task.get_mut().take() {
            handle.abort();
        }
    }
}

fn spawn_periodic_refresh(
    config: &FeedCacheConfig,
    coordinator: &Arc<RefreshCoordinator>,
) -> Option<JoinHandle<()>> {
    if config.refresh_interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(config.refresh_interval_secs);
    let coordinator = coordinator.clone();
    debug!(
        "Starting periodic refresh of feed {} every {:?}",
        coordinator.name(),
        period
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // 第一次tick立即完成，初始化时已经刷新过
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = coordinator.refresh().await {
                warn!("Periodic refresh of feed {} failed: {}", coordinator.name(), e);
            }
        }
    }))
}
