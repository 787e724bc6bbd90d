//! 评论统计分析 - 业务能力层
//!
//! 为下游情感分析练习提供简单的描述性统计

use std::collections::BTreeMap;

use crate::models::{Review, ReviewAnalysis};

/// 对评论集合做描述性统计
///
/// # 返回
/// 空集合返回 None，否则返回完整统计结果
pub fn analyze(reviews: &[Review]) -> Option<ReviewAnalysis> {
    if reviews.is_empty() {
        return None;
    }

    let total = reviews.len();

    let mut rating_distribution: BTreeMap<u8, usize> = BTreeMap::new();
    for review in reviews {
        *rating_distribution.entry(review.score).or_insert(0) += 1;
    }

    let score_sum: u64 = reviews.iter().map(|r| r.score as u64).sum();
    let thumbs_sum: u64 = reviews.iter().map(|r| r.thumbs_up_count as u64).sum();

    let positive = reviews.iter().filter(|r| r.score >= 4).count();
    let negative = reviews.iter().filter(|r| r.score <= 2).count();
    let neutral = reviews.iter().filter(|r| r.score == 3).count();

    let pct = |count: usize| count as f64 / total as f64 * 100.0;

    Some(ReviewAnalysis {
        total_reviews: total,
        average_rating: score_sum as f64 / total as f64,
        rating_distribution,
        reviews_with_thumbs_up: reviews.iter().filter(|r| r.thumbs_up_count > 0).count(),
        average_thumbs_up: thumbs_sum as f64 / total as f64,
        reviews_with_replies: reviews.iter().filter(|r| r.reply_content.is_some()).count(),
        most_recent_review: reviews.iter().map(|r| r.at).max(),
        oldest_review: reviews.iter().map(|r| r.at).min(),
        positive_reviews: positive,
        neutral_reviews: neutral,
        negative_reviews: negative,
        positive_percentage: pct(positive),
        neutral_percentage: pct(neutral),
        negative_percentage: pct(negative),
    })
}
