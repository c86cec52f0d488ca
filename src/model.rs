//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Feed缓存的数据模型。
//!
//! - [`Item`]：数据源中的完整条目（含作者、图片、标签、关联会话等关系对象）
//! - [`CachedItem`]：刷新时生成的不可变快照，扁平化存储
//! - [`FeedEntry`]：排序索引中的 (score, member) 对
//! - [`Cursor`]：基于score的分页游标

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 条目标识符
pub type ItemId = i64;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// 活跃
    #[default]
    Active,
    /// 已关闭
    Closed,
    /// 已隐藏
    Hidden,
}

/// 性别标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
}

/// 作者信息（数据源中的用户对象）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub nickname: String,
    pub avatar_url: Option<String>,
    /// 粗粒度位置（城市级别）
    pub city: Option<String>,
    pub gender: Gender,
    pub verified: bool,
}

/// 图片对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// 标签对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// 关联会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRef {
    pub id: i64,
    pub title: String,
}

/// 数据源中的完整条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub author: Author,
    pub title: String,
    pub content: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    pub images: Vec<Image>,
    pub tags: Vec<Tag>,
    pub chat: Option<ChatRef>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 条目的自然过期时间
    pub expires_at: DateTime<Utc>,
}

impl Item {
    /// 排序分数：最后更新时间（毫秒级epoch）
    pub fn score(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    /// 相对于 `now` 的剩余存活时间，已过期返回None
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

/// 缓存中的条目快照
///
/// 刷新时由 [`Item`] 扁平化生成：作者字段展开，图片只保留URL，
/// 标签只保留名称，不包含任何关系对象。只会被整体替换，不会原地修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedItem {
    pub id: ItemId,
    pub author_id: i64,
    pub author_nickname: String,
    pub author_avatar: Option<String>,
    pub author_city: Option<String>,
    pub author_gender: Gender,
    pub author_verified: bool,
    pub title: String,
    pub content: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    pub image_urls: Vec<String>,
    pub tags: Vec<String>,
    pub chat_id: Option<i64>,
    pub status: ItemStatus,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedItem {
    pub fn score(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl From<&Item> for CachedItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            author_id: item.author.id,
            author_nickname: item.author.nickname.clone(),
            author_avatar: item.author.avatar_url.clone(),
            author_city: item.author.city.clone(),
            author_gender: item.author.gender,
            author_verified: item.author.verified,
            title: item.title.clone(),
            content: item.content.clone(),
            like_count: item.like_count,
            comment_count: item.comment_count,
            view_count: item.view_count,
            image_urls: item.images.iter().map(|i| i.url.clone()).collect(),
            tags: item.tags.iter().map(|t| t.name.clone()).collect(),
            chat_id: item.chat.as_ref().map(|c| c.id),
            status: item.status,
            updated_at: item.updated_at,
            expires_at: item.expires_at,
        }
    }
}

/// 排序索引条目
///
/// score 为最后更新时间，member 为条目ID；索引内按 member 唯一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedEntry {
    pub score: i64,
    pub member: ItemId,
}

impl FeedEntry {
    pub fn new(score: i64, member: ItemId) -> Self {
        Self { score, member }
    }
}

/// 分页游标
///
/// 值为上一页最后一个索引条目的score，下一页取 score 严格小于游标的条目。
/// 只有0表示第一页；索引中的score恒为正，所以非零游标总会向后推进。
/// 游标不是偏移量，对插入不敏感。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cursor(i64);

impl Cursor {
    /// 第一页
    pub const START: Cursor = Cursor(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_start(self) -> bool {
        self.0 == 0
    }

    /// 范围查询的上界（不含），第一页时无上界
    pub fn upper_bound(self) -> Option<i64> {
        if self.is_start() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl From<i64> for Cursor {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
