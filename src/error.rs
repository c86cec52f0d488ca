//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存的错误类型。
//!
//! 读路径不会向调用方暴露这些错误：读取失败一律映射为回源信号，
//! 这里的错误只出现在刷新、初始化和配置等管理操作中。

use thiserror::Error;

/// Feed缓存错误类型枚举
#[derive(Error, Debug)]
pub enum FeedError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 数据源（ItemStore）查询失败
    #[error("Item store query failed: {0}")]
    Source(String),

    /// 缓存后端操作失败
    #[error("Backend operation failed: {0}")]
    Backend(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 初始化失败，缓存不可用
    #[error("Initialization failed: {0}")]
    Initialization(String),
}

/// Feed缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, FeedError>;
