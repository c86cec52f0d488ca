//! feedcache - 最近条目Feed缓存
//!
//! 维护一份按最后更新时间排序的最近活跃条目快照，支持基于游标的分页读取。
//! 刷新在独占锁内整代替换数据；读路径从不等待刷新，拿不到锁时返回回源信号，
//! 由调用方直接查询数据源。后端可选进程内 Moka 或 Redis（单机/哨兵/集群）。

#![doc(html_root_url = "https://docs.rs/feedcache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod reader;
pub mod serialization;
pub mod store;
pub mod telemetry;
pub mod trigger;

// Re-export commonly used items
pub use config::FeedCacheConfig;
pub use coordinator::{RefreshCoordinator, RefreshReport};
pub use error::{FeedError, Result};
pub use health::FeedHealth;
pub use manager::FeedCache;
pub use model::{CachedItem, Cursor, FeedEntry, Item, ItemId};
pub use reader::{FallbackReason, FeedPage, FeedReader, ReadOutcome};
pub use store::{ItemStore, MemoryItemStore};
pub use trigger::WriteTrigger;

/// feedcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
