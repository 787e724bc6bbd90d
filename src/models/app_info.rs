//! 应用基本信息模型

use serde::{Deserialize, Serialize};

/// 应用在商店页面上的基本信息
///
/// 所有字段均为可选，商店页面缺失的字段保持 None
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    /// 应用名称
    pub title: Option<String>,
    /// 开发者名称
    pub developer: Option<String>,
    /// 综合评分
    pub score: Option<f64>,
    /// 评分总数
    pub ratings: Option<u64>,
    /// 应用分类
    pub genre: Option<String>,
    /// 内容分级
    pub content_rating: Option<String>,
    /// 价格
    pub price: Option<String>,
    /// 是否免费
    pub free: Option<bool>,
    /// 应用描述
    pub description: Option<String>,
}
