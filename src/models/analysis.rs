//! 评论统计结果模型

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 评论集合的描述性统计
///
/// 情感分桶规则：4-5 星为正面，3 星为中性，1-2 星为负面
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAnalysis {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// 各评分的评论数量
    pub rating_distribution: BTreeMap<u8, usize>,
    pub reviews_with_thumbs_up: usize,
    pub average_thumbs_up: f64,
    pub reviews_with_replies: usize,
    pub most_recent_review: Option<DateTime<Utc>>,
    pub oldest_review: Option<DateTime<Utc>>,
    pub positive_reviews: usize,
    pub neutral_reviews: usize,
    pub negative_reviews: usize,
    pub positive_percentage: f64,
    pub neutral_percentage: f64,
    pub negative_percentage: f64,
}
