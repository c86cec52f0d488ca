//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存的配置结构和解析逻辑。

use crate::error::{FeedError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// Feed缓存配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedCacheConfig {
    pub config_version: Option<u32>,
    /// Feed名称，用作键前缀和指标标签
    pub name: String,
    /// Feed中最多保留的条目数（K）
    pub load_limit: usize,
    /// 每创建多少个条目触发一次异步刷新，0表示禁用
    pub refresh_threshold: u64,
    /// 定时刷新间隔（秒），0表示禁用
    pub refresh_interval_secs: u64,
    /// 连续刷新失败多少次后升级为不可用，0表示永不升级
    pub max_consecutive_failures: u32,
    /// 序列化类型
    pub serialization: SerializationType,
    /// 是否压缩缓存条目
    pub compress: bool,
    /// 缓存后端类型
    pub backend: BackendType,
    /// 内存后端配置
    pub memory: MemoryConfig,
    /// Redis后端配置
    pub redis: Option<RedisConfig>,
}

impl Default for FeedCacheConfig {
    fn default() -> Self {
        Self {
            config_version: None,
            name: "feed".to_string(),
            load_limit: 1000,
            refresh_threshold: 1000,
            refresh_interval_secs: 0,
            max_consecutive_failures: 3,
            serialization: SerializationType::Json,
            compress: false,
            backend: BackendType::Memory,
            memory: MemoryConfig::default(),
            redis: None,
        }
    }
}

/// 序列化类型枚举
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
}

/// 缓存后端类型
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// 进程内存（Moka）
    #[default]
    Memory,
    /// Redis
    Redis,
}

/// 内存后端配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MemoryConfig {
    /// 条目表最大容量（条目数）
    pub max_capacity: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

/// Redis后端配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
    /// 集群配置
    pub cluster: Option<ClusterConfig>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
            cluster: None,
        }
    }
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

/// 集群配置
#[derive(Deserialize, Clone, Debug)]
pub struct ClusterConfig {
    /// 初始节点列表
    pub nodes: Vec<String>,
}

/// Redis模式枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    #[default]
    Standalone,
    /// 哨兵模式
    Sentinel,
    /// 集群模式
    Cluster,
}

impl FeedCacheConfig {
    /// 从TOML字符串解析配置并验证
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: FeedCacheConfig =
            toml::from_str(s).map_err(|e| FeedError::Config(e.to_string()))?;
        config.validate().map_err(FeedError::Config)?;
        Ok(config)
    }

    /// 从TOML文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.name.is_empty() {
            return Err("Feed name cannot be empty".to_string());
        }

        if self.name.len() > 64 {
            return Err(format!(
                "Feed name '{}' exceeds maximum length of 64 characters",
                self.name
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(format!("Feed name '{}' cannot contain whitespace", self.name));
        }

        if self.load_limit == 0 || self.load_limit > 100_000 {
            return Err("load_limit must be between 1 and 100000".to_string());
        }

        if self.refresh_interval_secs > 86400 {
            return Err("refresh_interval_secs cannot exceed 86400 seconds".to_string());
        }

        match self.backend {
            BackendType::Memory => {
                if self.memory.max_capacity == 0 {
                    return Err("memory max_capacity cannot be zero".to_string());
                }
                // 条目表容量不足时刷新写入的条目会被挤出
                if (self.memory.max_capacity as usize) < self.load_limit {
                    return Err(format!(
                        "memory max_capacity ({}) must be >= load_limit ({})",
                        self.memory.max_capacity, self.load_limit
                    ));
                }
            }
            BackendType::Redis => {
                let redis = self
                    .redis
                    .as_ref()
                    .ok_or_else(|| "redis backend selected but [redis] is missing".to_string())?;

                if !(100..=30000).contains(&redis.connection_timeout_ms) {
                    return Err("redis connection_timeout_ms must be between 100 and 30000 ms"
                        .to_string());
                }

                if !(100..=60000).contains(&redis.command_timeout_ms) {
                    return Err(
                        "redis command_timeout_ms must be between 100 and 60000 ms".to_string()
                    );
                }

                match redis.mode {
                    RedisMode::Sentinel if redis.sentinel.is_none() => {
                        return Err("sentinel mode requires [redis.sentinel]".to_string());
                    }
                    RedisMode::Cluster if redis.cluster.is_none() => {
                        return Err("cluster mode requires [redis.cluster]".to_string());
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}
