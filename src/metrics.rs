//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存的指标收集功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 指标收集器
///
/// 用于收集和存储Feed缓存的运行时指标
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 读请求统计
    /// key: (feed, outcome)
    pub reads_total: Arc<Mutex<HashMap<(String, String), u64>>>,
    /// 刷新统计
    /// key: (feed, result)
    pub refreshes_total: Arc<Mutex<HashMap<(String, String), u64>>>,
    /// 最近一次成功刷新后的索引大小
    pub feed_size: Arc<Mutex<HashMap<String, usize>>>,
    /// 最近一次刷新跳过的条目数
    pub refresh_skipped: Arc<Mutex<HashMap<String, usize>>>,
    /// 刷新耗时 (total_duration_secs, count)
    pub refresh_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
    /// 写触发器调度的刷新次数
    pub trigger_scheduled: Arc<Mutex<HashMap<String, u64>>>,
    /// 健康状态码
    pub health_status: Arc<Mutex<HashMap<String, u8>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标写入不应因为其他线程panic而失败
fn locked<T>(m: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Metrics {
    /// 记录一次读请求
    ///
    /// # 参数
    ///
    /// * `feed` - Feed名称
    /// * `outcome` - 读取结果（ok / fallback:<reason>）
    pub fn record_read(&self, feed: &str, outcome: &str) {
        let key = (feed.to_string(), outcome.to_string());
        *locked(&self.reads_total).entry(key).or_insert(0) += 1;
    }

    /// 记录一次刷新
    pub fn record_refresh(&self, feed: &str, result: &str, duration_secs: f64) {
        let key = (feed.to_string(), result.to_string());
        *locked(&self.refreshes_total).entry(key).or_insert(0) += 1;

        let mut durations = locked(&self.refresh_duration);
        let entry = durations.entry(feed.to_string()).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 记录刷新后的索引大小和跳过数
    pub fn set_generation_size(&self, feed: &str, size: usize, skipped: usize) {
        locked(&self.feed_size).insert(feed.to_string(), size);
        locked(&self.refresh_skipped).insert(feed.to_string(), skipped);
    }

    /// 记录写触发器调度了一次刷新
    pub fn record_trigger(&self, feed: &str) {
        *locked(&self.trigger_scheduled)
            .entry(feed.to_string())
            .or_insert(0) += 1;
    }

    /// 设置健康状态
    pub fn set_health(&self, feed: &str, status: u8) {
        locked(&self.health_status).insert(feed.to_string(), status);
    }

    /// 读取某个读结果的计数
    pub fn reads(&self, feed: &str, outcome: &str) -> u64 {
        locked(&self.reads_total)
            .get(&(feed.to_string(), outcome.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// 读取某个刷新结果的计数
    pub fn refreshes(&self, feed: &str, result: &str) -> u64 {
        locked(&self.refreshes_total)
            .get(&(feed.to_string(), result.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为Prometheus文本格式
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let mut output = String::new();

    for ((feed, outcome), v) in locked(&metrics.reads_total).iter() {
        output.push_str(&format!(
            "feed_reads_total{{feed=\"{}\", outcome=\"{}\"}} {}\n",
            feed, outcome, v
        ));
    }
    for ((feed, result), v) in locked(&metrics.refreshes_total).iter() {
        output.push_str(&format!(
            "feed_refreshes_total{{feed=\"{}\", result=\"{}\"}} {}\n",
            feed, result, v
        ));
    }
    for (feed, (total, count)) in locked(&metrics.refresh_duration).iter() {
        output.push_str(&format!(
            "feed_refresh_duration_seconds_sum{{feed=\"{}\"}} {}\n",
            feed, total
        ));
        output.push_str(&format!(
            "feed_refresh_duration_seconds_count{{feed=\"{}\"}} {}\n",
            feed, count
        ));
    }
    for (feed, v) in locked(&metrics.feed_size).iter() {
        output.push_str(&format!("feed_index_size{{feed=\"{}\"}} {}\n", feed, v));
    }
    for (feed, v) in locked(&metrics.refresh_skipped).iter() {
        output.push_str(&format!(
            "feed_refresh_skipped_items{{feed=\"{}\"}} {}\n",
            feed, v
        ));
    }
    for (feed, v) in locked(&metrics.trigger_scheduled).iter() {
        output.push_str(&format!(
            "feed_trigger_scheduled_total{{feed=\"{}\"}} {}\n",
            feed, v
        ));
    }
    for (feed, v) in locked(&metrics.health_status).iter() {
        output.push_str(&format!("feed_health_status{{feed=\"{}\"}} {}\n", feed, v));
    }
    output
}
