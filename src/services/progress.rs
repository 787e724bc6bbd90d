//! 收集进度上报 - 业务能力层
//!
//! 收集循环通过该接口上报进度，自身不直接打印日志，
//! 这样核心逻辑保持纯粹、便于单独测试

use tracing::{info, warn};

/// 收集进度观察者
///
/// 所有方法都有空默认实现，按需覆盖
pub trait ProgressReporter {
    fn batch_started(&self, _batch_num: usize, _total_batches: usize, _batch_size: usize) {}
    fn batch_finished(&self, _batch_num: usize, _new_count: usize, _collected: usize) {}
    fn batch_failed(&self, _batch_num: usize, _error: &dyn std::fmt::Display) {}
    fn retrying(&self, _batch_num: usize, _smaller: usize) {}
    fn retry_failed(&self, _batch_num: usize) {}
    fn target_reached(&self, _target: usize) {}
    fn source_exhausted(&self, _collected: usize) {}
    fn cancelled(&self, _collected: usize) {}
}

/// 静默观察者（测试用）
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// 基于 tracing 的观察者
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn batch_started(&self, batch_num: usize, total_batches: usize, batch_size: usize) {
        info!("📦 批次 {}/{} - 目标 {} 条", batch_num, total_batches, batch_size);
    }

    fn batch_finished(&self, batch_num: usize, new_count: usize, collected: usize) {
        if new_count > 0 {
            info!("✅ 批次 {}: 新增 {} 条（累计 {}）", batch_num, new_count, collected);
        } else {
            warn!("⚠️ 批次 {}: 没有新评论", batch_num);
        }
    }

    fn batch_failed(&self, batch_num: usize, error: &dyn std::fmt::Display) {
        warn!("❌ 批次 {} 失败: {}", batch_num, error);
    }

    fn retrying(&self, batch_num: usize, smaller: usize) {
        info!("🔄 批次 {}: 以 {} 条重试一次...", batch_num, smaller);
    }

    fn retry_failed(&self, batch_num: usize) {
        warn!("❌ 批次 {} 重试仍然失败，跳过", batch_num);
    }

    fn target_reached(&self, target: usize) {
        info!("🎯 已达到目标 {} 条", target);
    }

    fn source_exhausted(&self, collected: usize) {
        warn!("⚠️ 连续多个批次没有新评论，提前结束（累计 {} 条）", collected);
    }

    fn cancelled(&self, collected: usize) {
        warn!("⏹️ 收集被用户中断（累计 {} 条）", collected);
    }
}
