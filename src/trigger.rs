//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了写入触发器。
//!
//! 每创建一个条目计数加一；计数恰好达到阈值的那次调用负责调度一次异步刷新并把计数归零。
//! 比较和归零在同一个原子操作中完成，并发创建时每个周期只会调度一次。

use crate::coordinator::RefreshCoordinator;
use crate::metrics::GLOBAL_METRICS;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// 写入触发器
pub struct WriteTrigger {
    counter: AtomicU64,
    threshold: u64,
    coordinator: Arc<RefreshCoordinator>,
    runtime: Handle,
}

impl WriteTrigger {
    /// 创建写入触发器
    ///
    /// 必须在tokio运行时内调用，之后的 [`increment`](Self::increment) 可以在任意线程调用。
    /// `threshold` 为0时触发器被禁用。
    pub fn new(threshold: u64, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self::with_handle(threshold, coordinator, Handle::current())
    }

    pub fn with_handle(threshold: u64, coordinator: Arc<RefreshCoordinator>, runtime: Handle) -> Self {
        Self {
            counter: AtomicU64::new(0),
            threshold,
            coordinator,
            runtime,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// 当前周期内已计数的创建次数
    pub fn pending(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// 记录一次条目创建
    ///
    /// 不等待刷新完成；返回本次调用是否调度了刷新。
    pub fn increment(&self) -> bool {
        if self.threshold == 0 {
            return false;
        }

        let threshold = self.threshold;
        let crossed = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n + 1 >= threshold {
                    Some(0)
                } else {
                    Some(n + 1)
                }
            })
            .map(|prev| prev + 1 >= threshold)
            .unwrap_or(false);

        if crossed {
            self.schedule_refresh();
        }
        crossed
    }

    fn schedule_refresh(&self) {
        let coordinator = self.coordinator.clone();
        GLOBAL_METRICS.record_trigger(coordinator.name());
        debug!(
            "Write threshold {} reached, scheduling refresh of feed {}",
            self.threshold,
            coordinator.name()
        );
        self.runtime.spawn(async move {
            if let Err(e) = coordinator.refresh().await {
                warn!("Triggered refresh of feed {} failed: {}", coordinator.name(), e);
            }
        });
    }
}
