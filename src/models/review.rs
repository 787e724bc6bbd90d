//! 评论数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单条用户评论
///
/// 字段一经拉取即不可变。序列化采用 camelCase 字段名，
/// 与原始数据集的 JSON/CSV 格式保持一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// 评论唯一标识
    pub review_id: String,
    /// 用户名
    pub user_name: String,
    /// 用户头像 URL
    pub user_image: Option<String>,
    /// 评论内容
    pub content: String,
    /// 评分（1-5）
    pub score: u8,
    /// 认为有用的人数
    pub thumbs_up_count: u32,
    /// 发表评论时的应用版本
    pub review_created_version: Option<String>,
    /// 评论时间
    pub at: DateTime<Utc>,
    /// 开发者回复内容
    pub reply_content: Option<String>,
    /// 开发者回复时间
    pub reply_at: Option<DateTime<Utc>>,
    /// 应用版本
    pub app_version: Option<String>,
}
