//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{FeedError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 基于serde_json，可选gzip压缩（需要 `flate2` 特性）
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    /// 是否启用压缩
    compress: bool,
}

impl JsonSerializer {
    /// 创建新的JSON序列化器
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的JSON序列化器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }

    pub fn is_compressed(&self) -> bool {
        self.compress
    }
}

#[cfg(feature = "flate2")]
fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| FeedError::Serialization(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| FeedError::Serialization(e.to_string()))
}

#[cfg(feature = "flate2")]
fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| FeedError::Serialization(e.to_string()))?;
    Ok(decoded)
}

// 未启用flate2特性时压缩退化为原样输出
#[cfg(not(feature = "flate2"))]
fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}

#[cfg(not(feature = "flate2"))]
fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(value).map_err(|e| FeedError::Serialization(e.to_string()))?;

        if self.compress {
            gzip(&json_bytes)
        } else {
            Ok(json_bytes)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        if self.compress {
            let decoded = gunzip(data)?;
            serde_json::from_slice(&decoded).map_err(|e| FeedError::Serialization(e.to_string()))
        } else {
            serde_json::from_slice(data).map_err(|e| FeedError::Serialization(e.to_string()))
        }
    }
}
