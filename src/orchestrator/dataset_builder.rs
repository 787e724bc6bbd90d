//! 大数据集编排 - 编排层
//!
//! ## 职责
//!
//! 对评分 1-5 依次运行批量收集器，拼接结果并汇总每个评分的
//! 收集数量。评论 ID 全局唯一，跨评分无需再去重。
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个批次的细节，向下委托收集器
//! - **限速**：评分之间等待固定延迟，最后一个评分之后不等待
//! - **可中断**：中断标志在评分之间检查，返回已收集的结果

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::clients::ReviewSource;
use crate::error::Result;
use crate::models::Review;
use crate::services::collector::{BatchCollector, CancelFlag};
use crate::services::progress::ProgressReporter;

const RATINGS: [u8; 5] = [1, 2, 3, 4, 5];

/// 每个评分的收集结果统计
#[derive(Debug, Default)]
pub struct RatingReport {
    /// 各评分实际收集到的数量
    pub counts: BTreeMap<u8, usize>,
    pub total: usize,
}

impl RatingReport {
    fn record(&mut self, rating: u8, count: usize) {
        self.counts.insert(rating, count);
        self.total += count;
    }

    /// 输出最终统计（各评分占比与目标达成度）
    pub fn log_summary(&self, target_per_rating: usize) {
        let target_total = target_per_rating * RATINGS.len();

        info!("\n{}", "=".repeat(60));
        info!("📊 最终统计:");
        for (rating, count) in &self.counts {
            let pct = if self.total > 0 {
                *count as f64 / self.total as f64 * 100.0
            } else {
                0.0
            };
            info!("   ⭐ 评分 {}: {} 条 ({:.1}%)", rating, count, pct);
        }
        info!("📈 总计: {} / 目标 {} 条", self.total, target_total);

        if self.total * 10 >= target_total * 8 {
            info!("✅ 数据集收集完成度良好");
        } else if self.total * 2 >= target_total {
            info!("⚠️ 数据量可用于分析，但未达目标");
        } else {
            info!("❌ 数据量远低于目标，建议重试");
        }
        info!("{}", "=".repeat(60));
    }
}

/// 大数据集编排器
pub struct DatasetBuilder<R: ProgressReporter> {
    collector: BatchCollector<R>,
    rating_delay: Duration,
    cancel: CancelFlag,
}

impl<R: ProgressReporter> DatasetBuilder<R> {
    /// 创建新的编排器
    pub fn new(collector: BatchCollector<R>, rating_delay: Duration, cancel: CancelFlag) -> Self {
        Self {
            collector,
            rating_delay,
            cancel,
        }
    }

    /// 对评分 1-5 逐个运行收集器并拼接结果
    ///
    /// # 参数
    /// - `source`: 评论来源
    /// - `target_per_rating`: 每个评分的目标数量
    /// - `batch_size`: 收集器的单批大小
    ///
    /// # 返回
    /// 拼接后的评论列表与每个评分的统计
    pub async fn build<S: ReviewSource>(
        &self,
        source: &mut S,
        target_per_rating: usize,
        batch_size: usize,
    ) -> Result<(Vec<Review>, RatingReport)> {
        let mut all: Vec<Review> = Vec::new();
        let mut report = RatingReport::default();

        for (idx, rating) in RATINGS.iter().copied().enumerate() {
            if self.cancel.is_cancelled() {
                info!("⏹️ 编排被中断，返回已收集的 {} 条", all.len());
                break;
            }

            info!("\n⭐ 评分 {} - 目标 {} 条", rating, target_per_rating);
            let reviews = self
                .collector
                .collect(source, Some(rating), target_per_rating, batch_size)
                .await?;

            info!("📊 评分 {}: 收集到 {} 条", rating, reviews.len());
            report.record(rating, reviews.len());
            all.extend(reviews);
            info!(
                "📈 总进度: {} / {} 条",
                all.len(),
                target_per_rating * RATINGS.len()
            );

            // 最后一个评分之后不等待
            if idx + 1 < RATINGS.len() && !self.rating_delay.is_zero() {
                info!("⏱️ 等待 {} 秒后继续下一个评分...", self.rating_delay.as_secs());
                sleep(self.rating_delay).await;
            }
        }

        Ok((all, report))
    }
}
