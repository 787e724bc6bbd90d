//! 批量收集器 - 核心层
//!
//! ## 职责
//!
//! 对单个评分过滤条件执行"分批拉取 + 按 ID 去重累积"的收集循环。
//!
//! ## 核心行为
//!
//! 1. **分批拉取**：按 `ceil(target / batch_size)` 计算批次数，
//!    每批拉取 `min(batch_size, remaining)` 条
//! 2. **去重累积**：按 review_id 过滤已收集的评论，保持返回顺序追加
//! 3. **失败降级**：某批失败时以半量重试恰好一次，仍失败则跳过该批
//! 4. **限速**：批次之间等待固定延迟
//! 5. **提前终止**：达到目标、批次耗尽、数据源耗尽或用户中断
//!
//! 单批失败不会向外传播；即使每一批都失败，也返回已收集的
//! （可能为空的）结果。只有入参校验失败才返回错误。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::clients::ReviewSource;
use crate::error::{AppError, Result};
use crate::models::Review;
use crate::services::progress::ProgressReporter;

/// 连续多少个批次没有新评论视为数据源耗尽
const MAX_EMPTY_BATCHES: usize = 3;

/// 全局中断标志
///
/// 由 Ctrl-C 处理任务置位，收集循环在批次之间检查；
/// 中断后返回已收集的结果
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 批量收集器
pub struct BatchCollector<R: ProgressReporter> {
    reporter: R,
    batch_delay: Duration,
    cancel: CancelFlag,
}

impl<R: ProgressReporter> BatchCollector<R> {
    /// 创建新的批量收集器
    pub fn new(reporter: R, batch_delay: Duration, cancel: CancelFlag) -> Self {
        Self {
            reporter,
            batch_delay,
            cancel,
        }
    }

    /// 收集最多 `target_count` 条互不重复的评论
    ///
    /// # 参数
    /// - `source`: 评论来源
    /// - `rating`: 评分过滤条件，None 表示不过滤
    /// - `target_count`: 期望收集的唯一评论数量，0 表示不收集
    /// - `batch_size`: 单批拉取上限，必须大于 0
    ///
    /// # 返回
    /// 按拉取顺序排列、无重复 ID 的评论列表。结果数量通常不超过
    /// `target_count`；仅当单批返回超量数据时可能略多（收集器不截断，
    /// 超量裁剪是数据源的责任）。
    pub async fn collect<S: ReviewSource>(
        &self,
        source: &mut S,
        rating: Option<u8>,
        target_count: usize,
        batch_size: usize,
    ) -> Result<Vec<Review>> {
        validate(rating, batch_size)?;

        if target_count == 0 {
            return Ok(Vec::new());
        }

        let num_batches = (target_count + batch_size - 1) / batch_size;
        let mut all: Vec<Review> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut empty_streak = 0usize;

        for batch_num in 1..=num_batches {
            if self.cancel.is_cancelled() {
                self.reporter.cancelled(all.len());
                break;
            }

            let remaining = target_count.saturating_sub(all.len());
            if remaining == 0 {
                break;
            }
            let current = batch_size.min(remaining);
            self.reporter.batch_started(batch_num, num_batches, current);

            match source.fetch(rating, current).await {
                Ok(batch) => {
                    let new_count = merge_deduped(&mut all, &mut seen, batch);
                    self.reporter.batch_finished(batch_num, new_count, all.len());
                    if new_count == 0 {
                        empty_streak += 1;
                    } else {
                        empty_streak = 0;
                    }
                }
                Err(e) => {
                    self.reporter.batch_failed(batch_num, &e);

                    // 半量重试恰好一次，半量为 0 时跳过
                    let smaller = current / 2;
                    if smaller > 0 {
                        self.reporter.retrying(batch_num, smaller);
                        match source.fetch(rating, smaller).await {
                            Ok(batch) => {
                                let new_count = merge_deduped(&mut all, &mut seen, batch);
                                self.reporter.batch_finished(batch_num, new_count, all.len());
                                if new_count == 0 {
                                    empty_streak += 1;
                                } else {
                                    empty_streak = 0;
                                }
                            }
                            Err(_) => self.reporter.retry_failed(batch_num),
                        }
                    }
                }
            }

            if all.len() >= target_count {
                self.reporter.target_reached(target_count);
                break;
            }
            if empty_streak >= MAX_EMPTY_BATCHES {
                self.reporter.source_exhausted(all.len());
                break;
            }
            // 只在还有下一批时等待
            if batch_num < num_batches && !self.batch_delay.is_zero() {
                sleep(self.batch_delay).await;
            }
        }

        Ok(all)
    }
}

/// 按 review_id 去重合并，返回新增数量
fn merge_deduped(all: &mut Vec<Review>, seen: &mut HashSet<String>, batch: Vec<Review>) -> usize {
    let before = all.len();
    for review in batch {
        if seen.insert(review.review_id.clone()) {
            all.push(review);
        }
    }
    all.len() - before
}

fn validate(rating: Option<u8>, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(AppError::invalid_batch_size(batch_size));
    }
    if let Some(r) = rating {
        if !(1..=5).contains(&r) {
            return Err(AppError::invalid_rating(r));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusinessError;
    use crate::services::progress::SilentReporter;
    use chrono::DateTime;
    use std::collections::VecDeque;

    /// 按脚本逐次返回结果的评论来源
    struct StubSource {
        script: VecDeque<Result<Vec<Review>>>,
        calls: Vec<(Option<u8>, usize)>,
    }

    impl StubSource {
        fn new(script: Vec<Result<Vec<Review>>>) -> Self {
            Self {
                script: script.into(),
                calls: Vec::new(),
            }
        }
    }

    impl ReviewSource for StubSource {
        async fn fetch(&mut self, rating: Option<u8>, count: usize) -> Result<Vec<Review>> {
            self.calls.push((rating, count));
            self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn review(id: &str) -> Review {
        Review {
            review_id: id.to_string(),
            user_name: format!("user-{}", id),
            user_image: None,
            content: "some content".to_string(),
            score: 4,
            thumbs_up_count: 0,
            review_created_version: None,
            at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            reply_content: None,
            reply_at: None,
            app_version: None,
        }
    }

    fn reviews(ids: &[&str]) -> Vec<Review> {
        ids.iter().map(|id| review(id)).collect()
    }

    fn collector() -> BatchCollector<SilentReporter> {
        BatchCollector::new(SilentReporter, Duration::ZERO, CancelFlag::new())
    }

    fn ids(result: &[Review]) -> Vec<&str> {
        result.iter().map(|r| r.review_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_dedup_across_batches() {
        let mut source = StubSource::new(vec![
            Ok(reviews(&["1", "2"])),
            Ok(reviews(&["2", "3"])),
        ]);

        let result = collector()
            .collect(&mut source, None, 4, 2)
            .await
            .unwrap();

        // 重复的 id=2 被过滤，顺序保持拉取顺序
        assert_eq!(ids(&result), vec!["1", "2", "3"]);
        assert_eq!(source.calls, vec![(None, 2), (None, 2)]);
        // 结果不超过请求总量
        assert!(result.len() <= 4);
    }

    #[tokio::test]
    async fn test_target_zero_invokes_no_fetch() {
        let mut source = StubSource::new(vec![Ok(reviews(&["1"]))]);

        let result = collector()
            .collect(&mut source, None, 0, 10)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(source.calls.is_empty());
    }

    #[tokio::test]
    async fn test_all_batches_fail_returns_empty_ok() {
        // 两个批次，每批原始请求与半量重试各失败一次
        let mut source = StubSource::new(vec![
            Err(AppError::Other("boom".into())),
            Err(AppError::Other("boom".into())),
            Err(AppError::Other("boom".into())),
            Err(AppError::Other("boom".into())),
        ]);

        let result = collector()
            .collect(&mut source, None, 4, 2)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(source.calls.len(), 4);
    }

    #[tokio::test]
    async fn test_halved_retry_recovers() {
        let mut source = StubSource::new(vec![
            Err(AppError::Other("transient".into())),
            Ok(reviews(&["5"])),
        ]);

        let result = collector()
            .collect(&mut source, None, 2, 2)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["5"]);
        // 重试请求数量是原批次的一半
        assert_eq!(source.calls, vec![(None, 2), (None, 1)]);
    }

    #[tokio::test]
    async fn test_retry_skipped_when_half_is_zero() {
        let mut source = StubSource::new(vec![
            Err(AppError::Other("transient".into())),
            Ok(reviews(&["a"])),
        ]);

        let result = collector()
            .collect(&mut source, None, 2, 1)
            .await
            .unwrap();

        // 批次大小 1 失败后不重试，直接进入下一批
        assert_eq!(ids(&result), vec!["a"]);
        assert_eq!(source.calls, vec![(None, 1), (None, 1)]);
    }

    #[tokio::test]
    async fn test_stops_early_once_target_reached() {
        let mut source = StubSource::new(vec![
            Ok(reviews(&["1", "2"])),
            Ok(reviews(&["3", "4"])),
            Ok(reviews(&["5", "6"])),
        ]);

        let result = collector()
            .collect(&mut source, None, 4, 2)
            .await
            .unwrap();

        assert_eq!(result.len(), 4);
        // 目标达成后不再发起第三批
        assert_eq!(source.calls.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_empty_batches() {
        // 数据源每次都返回同样的 10 条，第一批之后全部是重复
        let page = reviews(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
        let script: Vec<Result<Vec<Review>>> =
            (0..10).map(|_| Ok(page.clone())).collect();
        let mut source = StubSource::new(script);

        let result = collector()
            .collect(&mut source, None, 100, 10)
            .await
            .unwrap();

        assert_eq!(result.len(), 10);
        // 1 个有效批次 + 3 个连续零新增批次后终止
        assert_eq!(source.calls.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_batch_size_fails_fast() {
        let mut source = StubSource::new(vec![Ok(reviews(&["1"]))]);

        let err = collector()
            .collect(&mut source, None, 10, 0)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Business(BusinessError::InvalidBatchSize { batch_size: 0 })
        ));
        assert!(source.calls.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rating_fails_fast() {
        let mut source = StubSource::new(vec![Ok(reviews(&["1"]))]);

        let err = collector()
            .collect(&mut source, Some(6), 10, 5)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Business(BusinessError::InvalidRatingFilter { rating: 6 })
        ));
        assert!(source.calls.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_collected_so_far() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let collector = BatchCollector::new(SilentReporter, Duration::ZERO, cancel);
        let mut source = StubSource::new(vec![Ok(reviews(&["1"]))]);

        let result = collector.collect(&mut source, None, 10, 5).await.unwrap();

        assert!(result.is_empty());
        assert!(source.calls.is_empty());
    }

    #[tokio::test]
    async fn test_rating_filter_passed_through() {
        let mut source = StubSource::new(vec![Ok(reviews(&["1", "2", "3"]))]);

        let result = collector()
            .collect(&mut source, Some(3), 3, 3)
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(source.calls, vec![(Some(3), 3)]);
    }
}
