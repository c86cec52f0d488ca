//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存条目的序列化机制。
//!
//! 刷新时把完整的 [`Item`] 扁平化为 [`CachedItem`] 再编码为字节，
//! 读取时把字节解码回 [`CachedItem`]。

pub mod json;

use crate::config::SerializationType;
use crate::error::Result;
use crate::model::{CachedItem, Item};
use serde::{de::DeserializeOwned, Serialize};

pub use json::JsonSerializer;

/// 序列化器特征
///
/// 定义序列化和反序列化操作的接口
pub trait Serializer: Send + Sync {
    /// 序列化值为字节数组
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// 从字节数组反序列化值
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// 序列化器枚举
///
/// 用于在运行时按配置选择序列化器
#[derive(Clone, Debug)]
pub enum SerializerEnum {
    Json(JsonSerializer),
}

impl SerializerEnum {
    /// 根据配置创建序列化器
    pub fn from_config(kind: &SerializationType, compress: bool) -> Self {
        match kind {
            SerializationType::Json if compress => {
                SerializerEnum::Json(JsonSerializer::with_compression())
            }
            SerializationType::Json => SerializerEnum::Json(JsonSerializer::new()),
        }
    }

    /// 扁平化并编码一个完整条目
    pub fn encode_item(&self, item: &Item) -> Result<Vec<u8>> {
        self.serialize(&CachedItem::from(item))
    }

    /// 解码一个缓存条目
    pub fn decode_item(&self, data: &[u8]) -> Result<CachedItem> {
        self.deserialize(data)
    }
}

impl Default for SerializerEnum {
    fn default() -> Self {
        SerializerEnum::Json(JsonSerializer::new())
    }
}

impl Serializer for SerializerEnum {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            SerializerEnum::Json(s) => s.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            SerializerEnum::Json(s) => s.deserialize(data),
        }
    }
}
