//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed刷新的健康状态。
//!
//! 刷新失败时保留上一代数据继续服务（Stale）；连续失败达到阈值后
//! 升级为 Escalated，读路径停止返回旧数据，全部回源，直到下一次刷新成功。

use chrono::{DateTime, Utc};

/// Feed健康状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedHealth {
    /// 尚未完成任何一次成功刷新
    Uninitialized,
    /// 最近一次刷新成功
    Healthy {
        generation: u64,
        refreshed_at: DateTime<Utc>,
    },
    /// 刷新失败，继续服务上一代数据
    Stale {
        generation: u64,
        since: DateTime<Utc>,
        failure_count: u32,
    },
    /// 连续失败超过阈值，停止服务缓存数据
    Escalated {
        generation: u64,
        since: DateTime<Utc>,
        failure_count: u32,
    },
}

impl FeedHealth {
    /// 刷新成功后的状态
    pub fn after_success(generation: u64, now: DateTime<Utc>) -> Self {
        FeedHealth::Healthy {
            generation,
            refreshed_at: now,
        }
    }

    /// 刷新失败后的状态
    ///
    /// # 参数
    ///
    /// * `now` - 当前时间
    /// * `max_failures` - 升级阈值，0表示永不升级
    pub fn after_failure(&self, now: DateTime<Utc>, max_failures: u32) -> Self {
        let (generation, since, failure_count) = match *self {
            FeedHealth::Uninitialized => return FeedHealth::Uninitialized,
            FeedHealth::Healthy { generation, .. } => (generation, now, 1),
            FeedHealth::Stale {
                generation,
                since,
                failure_count,
            }
            | FeedHealth::Escalated {
                generation,
                since,
                failure_count,
            } => (generation, since, failure_count.saturating_add(1)),
        };

        if max_failures > 0 && failure_count >= max_failures {
            FeedHealth::Escalated {
                generation,
                since,
                failure_count,
            }
        } else {
            FeedHealth::Stale {
                generation,
                since,
                failure_count,
            }
        }
    }

    /// 当前状态下是否允许从缓存读取
    pub fn serves_reads(&self) -> bool {
        matches!(self, FeedHealth::Healthy { .. } | FeedHealth::Stale { .. })
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self, FeedHealth::Escalated { .. })
    }

    /// 当前生效的代号，未初始化为None
    pub fn generation(&self) -> Option<u64> {
        match *self {
            FeedHealth::Uninitialized => None,
            FeedHealth::Healthy { generation, .. }
            | FeedHealth::Stale { generation, .. }
            | FeedHealth::Escalated { generation, .. } => Some(generation),
        }
    }

    pub fn failure_count(&self) -> u32 {
        match *self {
            FeedHealth::Stale { failure_count, .. }
            | FeedHealth::Escalated { failure_count, .. } => failure_count,
            _ => 0,
        }
    }

    /// 指标用状态码（0: 不可用, 1: 健康, 2: 陈旧）
    pub fn status_code(&self) -> u8 {
        match self {
            FeedHealth::Healthy { .. } => 1,
            FeedHealth::Stale { .. } => 2,
            FeedHealth::Uninitialized | FeedHealth::Escalated { .. } => 0,
        }
    }
}
