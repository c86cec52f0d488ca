//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed分页读取。
//!
//! 读路径从不等待刷新：拿不到共享访问令牌就返回回源信号，由调用方直接查询数据源。

use crate::coordinator::RefreshCoordinator;
use crate::metrics::GLOBAL_METRICS;
use crate::model::{CachedItem, Cursor, ItemId};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 回源原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// 刷新进行中，未能获取共享访问
    Contended,
    /// 游标之后索引中没有条目（缓存为空或已翻到底）
    Exhausted,
    /// 缓存后端查询失败
    Backend,
    /// 缓存尚未初始化，或连续刷新失败已升级
    Stale,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Contended => "contended",
            FallbackReason::Exhausted => "exhausted",
            FallbackReason::Backend => "backend",
            FallbackReason::Stale => "stale",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 读取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadOutcome {
    Ok,
    /// 调用方必须直接查询数据源获取这一页
    Fallback(FallbackReason),
}

impl ReadOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReadOutcome::Fallback(_))
    }

    /// 指标标签（ok / fallback:<reason>）
    pub fn label(&self) -> String {
        match self {
            ReadOutcome::Ok => "ok".to_string(),
            ReadOutcome::Fallback(reason) => format!("fallback:{}", reason),
        }
    }
}

/// 一页读取结果
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<CachedItem>,
    /// 下一页游标；回源时保持为请求游标不变
    pub next_cursor: Cursor,
    pub outcome: ReadOutcome,
}

impl FeedPage {
    fn fallback(cursor: Cursor, reason: FallbackReason) -> Self {
        Self {
            items: Vec::new(),
            next_cursor: cursor,
            outcome: ReadOutcome::Fallback(reason),
        }
    }

    fn empty(cursor: Cursor) -> Self {
        Self {
            items: Vec::new(),
            next_cursor: cursor,
            outcome: ReadOutcome::Ok,
        }
    }
}

/// Feed读取器
#[derive(Clone)]
pub struct FeedReader {
    coordinator: Arc<RefreshCoordinator>,
}

impl FeedReader {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    /// 读取一页
    ///
    /// # 参数
    ///
    /// * `count` - 最多返回的条目数
    /// * `cursor` - 上一页返回的游标，[`Cursor::START`] 表示第一页
    ///
    /// # 返回值
    ///
    /// 返回的页中 `next_cursor` 为本次索引查询最后一个条目的score，
    /// 与条目体是否命中无关。
    #[instrument(skip(self), level = "debug", fields(feed = %self.coordinator.name()))]
    pub async fn get(&self, count: usize, cursor: Cursor) -> FeedPage {
        let page = self.read(count, cursor).await;
        GLOBAL_METRICS.record_read(self.coordinator.name(), &page.outcome.label());
        page
    }

    async fn read(&self, count: usize, cursor: Cursor) -> FeedPage {
        if count == 0 {
            return FeedPage::empty(cursor);
        }

        let guard = match self.coordinator.try_read() {
            Some(guard) => guard,
            None => {
                debug!("Refresh in progress, falling back to source");
                return FeedPage::fallback(cursor, FallbackReason::Contended);
            }
        };
        if !guard.health().serves_reads() {
            debug!("Feed not serving reads in state {:?}", guard.health());
            return FeedPage::fallback(cursor, FallbackReason::Stale);
        }

        let backend = guard.backend();
        let entries = match backend.range_below(cursor, count).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Feed index range query failed: {}", e);
                return FeedPage::fallback(cursor, FallbackReason::Backend);
            }
        };
        let next_cursor = match entries.last() {
            Some(last) => Cursor::new(last.score),
            None => return FeedPage::fallback(cursor, FallbackReason::Exhausted),
        };

        let ids: Vec<ItemId> = entries.iter().map(|e| e.member).collect();
        let bodies = match backend.get_items(&ids).await {
            Ok(bodies) => bodies,
            Err(e) => {
                warn!("Feed item fetch failed: {}", e);
                return FeedPage::fallback(cursor, FallbackReason::Backend);
            }
        };
        drop(guard);

        let serializer = self.coordinator.serializer();
        let now = Utc::now();
        let mut items = Vec::with_capacity(ids.len());
        for (id, body) in ids.iter().zip(bodies) {
            let Some(body) = body else {
                debug!("Item {} evicted since index read, dropping", id);
                continue;
            };
            match serializer.decode_item(&body) {
                Ok(item) if item.is_expired_at(now) => {
                    debug!("Item {} expired, dropping", id);
                }
                Ok(item) => items.push(item),
                Err(e) => warn!("Dropping undecodable item {}: {}", id, e),
            }
        }

        FeedPage {
            items,
            next_cursor,
            outcome: ReadOutcome::Ok,
        }
    }
}
