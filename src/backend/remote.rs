//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的后端实现。
//!
//! FeedIndex 存为有序集合（ZSET），每个条目快照存为带 PX 过期时间的字符串键。

use super::redis_provider::{DefaultRedisProvider, RedisProvider};
use super::{FeedBackend, KeySpace};
use crate::config::{RedisConfig, RedisMode};
use crate::error::{FeedError, Result};
use crate::model::{Cursor, FeedEntry, ItemId};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, FromRedisValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Redis连接
#[derive(Clone)]
enum Connection {
    Standalone(ConnectionManager),
    Cluster(redis::cluster::ClusterClient),
}

/// Redis后端实现
#[derive(Clone)]
pub struct RedisFeedBackend {
    conn: Connection,
    keys: KeySpace,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisFeedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.conn {
            Connection::Standalone(_) => "Standalone",
            Connection::Cluster(_) => "Cluster",
        };
        f.debug_struct("RedisFeedBackend")
            .field("mode", &mode)
            .field("feed", &self.keys.name())
            .finish()
    }
}

impl RedisFeedBackend {
    /// 创建新的Redis后端实例
    #[instrument(skip(config), level = "info", name = "init_redis_backend")]
    pub async fn new(config: &RedisConfig, keys: KeySpace) -> Result<Self> {
        Self::new_with_provider(config, keys, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者创建后端实例
    #[instrument(skip(config, provider), level = "info", fields(mode = ?config.mode))]
    pub async fn new_with_provider(
        config: &RedisConfig,
        keys: KeySpace,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        debug!("Initializing RedisFeedBackend with mode: {:?}", config.mode);
        let conn = match config.mode {
            RedisMode::Standalone => {
                let (_client, manager) = provider.get_standalone_client(config).await?;
                Connection::Standalone(manager)
            }
            RedisMode::Sentinel => {
                let (_client, manager) = provider.get_sentinel_client(config).await?;
                Connection::Standalone(manager)
            }
            RedisMode::Cluster => Connection::Cluster(provider.get_cluster_client(config).await?),
        };
        Ok(Self {
            conn,
            keys,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    async fn query_cmd<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let fut = async {
            match &self.conn {
                Connection::Standalone(manager) => cmd.query_async(&mut manager.clone()).await,
                Connection::Cluster(client) => match client.get_async_connection().await {
                    Ok(mut conn) => cmd.query_async(&mut conn).await,
                    Err(e) => Err(e),
                },
            }
        };
        self.with_timeout(fut).await
    }

    async fn query_pipe<T: FromRedisValue>(&self, pipe: &redis::Pipeline) -> Result<T> {
        let fut = async {
            match &self.conn {
                Connection::Standalone(manager) => pipe.query_async(&mut manager.clone()).await,
                Connection::Cluster(client) => match client.get_async_connection().await {
                    Ok(mut conn) => pipe.query_async(&mut conn).await,
                    Err(e) => Err(e),
                },
            }
        };
        self.with_timeout(fut).await
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FeedError::Backend(format!(
                "Redis command timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }

    /// 逐个删除条目键（集群模式下无法跨节点SCAN，按索引成员删除）
    async fn delete_indexed_items(&self) -> Result<usize> {
        let members: Vec<String> = self
            .query_cmd(
                redis::cmd("ZRANGE")
                    .arg(self.keys.index_key())
                    .arg(0)
                    .arg(-1),
            )
            .await?;
        let mut pipe = redis::pipe();
        for id in members.iter().filter_map(|m| m.parse::<ItemId>().ok()) {
            pipe.del(self.keys.item_key(id)).ignore();
        }
        if !members.is_empty() {
            self.query_pipe::<()>(&pipe).await?;
        }
        Ok(members.len())
    }

    async fn scan_delete_items(&self, manager: &ConnectionManager) -> Result<usize> {
        let pattern = self.keys.item_pattern();
        let mut conn = manager.clone();
        let mut cursor = 0u64;
        let mut deleted = 0usize;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let mut pipe = redis::pipe();
                for key in &keys {
                    pipe.del(key).ignore();
                }
                pipe.query_async::<()>(&mut conn).await?;
                deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl FeedBackend for RedisFeedBackend {
    #[instrument(skip(self, body), level = "debug", fields(body_len = body.len()))]
    async fn put_item(&self, id: ItemId, body: Vec<u8>, ttl: Duration) -> Result<()> {
        let ttl_ms = (ttl.as_millis() as u64).max(1);
        self.query_cmd::<()>(
            redis::cmd("SET")
                .arg(self.keys.item_key(id))
                .arg(body)
                .arg("PX")
                .arg(ttl_ms),
        )
        .await
    }

    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn replace_index(&self, entries: &[FeedEntry]) -> Result<()> {
        let index_key = self.keys.index_key();
        let mut pipe = redis::pipe();
        // 单机/哨兵下用MULTI包裹，集群下只依赖协调器的独占锁
        if matches!(self.conn, Connection::Standalone(_)) {
            pipe.atomic();
        }
        pipe.del(&index_key).ignore();
        if !entries.is_empty() {
            let zadd = pipe.cmd("ZADD").arg(&index_key);
            for entry in entries {
                zadd.arg(entry.score).arg(entry.member);
            }
            zadd.ignore();
        }
        self.query_pipe::<()>(&pipe).await?;
        debug!("Redis index replaced: key={}, size={}", index_key, entries.len());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn range_below(&self, cursor: Cursor, count: usize) -> Result<Vec<FeedEntry>> {
        let max = match cursor.upper_bound() {
            Some(bound) => format!("({}", bound),
            None => "+inf".to_string(),
        };
        let raw: Vec<(String, f64)> = self
            .query_cmd(
                redis::cmd("ZREVRANGEBYSCORE")
                    .arg(self.keys.index_key())
                    .arg(max)
                    .arg("-inf")
                    .arg("WITHSCORES")
                    .arg("LIMIT")
                    .arg(0)
                    .arg(count),
            )
            .await?;

        let mut entries = Vec::with_capacity(raw.len());
        for (member, score) in raw {
            match member.parse::<ItemId>() {
                Ok(id) => entries.push(FeedEntry::new(score as i64, id)),
                Err(_) => warn!("Ignoring malformed feed index member: {}", member),
            }
        }
        Ok(entries)
    }

    #[instrument(skip(self, ids), level = "debug", fields(id_count = ids.len()))]
    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Vec<u8>>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // 用管道逐键GET，避免集群模式下MGET跨槽
        let mut pipe = redis::pipe();
        for id in ids {
            pipe.get(self.keys.item_key(*id));
        }
        self.query_pipe(&pipe).await
    }

    async fn index_len(&self) -> Result<usize> {
        self.query_cmd(redis::cmd("ZCARD").arg(self.keys.index_key()))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<()> {
        let deleted = match &self.conn {
            Connection::Standalone(manager) => self.scan_delete_items(manager).await?,
            Connection::Cluster(_) => self.delete_indexed_items().await?,
        };
        self.query_cmd::<()>(redis::cmd("DEL").arg(self.keys.index_key()))
            .await?;
        debug!(
            "Redis backend cleared: feed={}, item_keys={}",
            self.keys.name(),
            deleted
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let response: String = self.query_cmd(&redis::cmd("PING")).await?;
        debug!("Redis ping: {}", response);
        Ok(())
    }
}
