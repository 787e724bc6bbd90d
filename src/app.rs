//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建数据集目录、安装 Ctrl-C 中断标志
//! 2. **菜单驱动**：展示收集模式菜单并分发到对应的收集流程
//! 3. **结果处理**：预览、统计分析、按用户选择的格式持久化
//!
//! ## 收集模式
//!
//! 1. 最新评论（默认 1000 条）
//! 2. 指定评分的评论（交互输入评分与数量）
//! 3. 大批量连续抓取（分页续传，4 × 1000 条）
//! 4. 均衡情感数据集（每个评分 200 条）
//! 5. 大数据集（每个评分 2000 条，批量收集器 + 错误降级）

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::clients::{PlayStoreClient, ReviewSource};
use crate::config::Config;
use crate::models::{AppInfo, Review, ReviewAnalysis};
use crate::orchestrator::DatasetBuilder;
use crate::services::analyzer;
use crate::services::collector::{BatchCollector, CancelFlag};
use crate::services::dataset_writer::DatasetWriter;
use crate::services::progress::LogReporter;
use crate::utils::truncate_text;

/// 应用主结构
pub struct App {
    config: Config,
    client: PlayStoreClient,
    writer: DatasetWriter,
    cancel: CancelFlag,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let writer = DatasetWriter::new(&config.dataset_dir, &config.file_prefix);
        writer.bootstrap()?;

        let cancel = CancelFlag::new();
        install_interrupt_handler(cancel.clone());

        let client = PlayStoreClient::new(&config);

        Ok(Self {
            config,
            client,
            writer,
            cancel,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<()> {
        print_banner(&self.config.app_id);

        // 应用信息获取失败不致命，继续收集流程
        let app_info = match self.client.get_app_info().await {
            Ok(info) => {
                print_app_info(&info);
                Some(info)
            }
            Err(e) => {
                warn!("⚠️ 获取应用信息失败: {}", e);
                None
            }
        };

        print_menu();
        let choice = prompt("\n请选择 (1-5): ")?;

        let reviews = match choice.trim() {
            "1" => self.scrape_newest().await?,
            "2" => self.scrape_by_rating().await?,
            "3" => self.scrape_continuation().await?,
            "4" => self.scrape_balanced().await?,
            "5" => self.scrape_large_dataset().await?,
            other => {
                error!("❌ 无效选项: {}", other);
                return Ok(());
            }
        };

        if reviews.is_empty() {
            error!("❌ 没有收集到任何评论");
            return Ok(());
        }

        info!("\n✅ 共收集 {} 条评论", reviews.len());
        preview_reviews(&reviews);

        let analysis = analyzer::analyze(&reviews);
        if let Some(analysis) = &analysis {
            print_analysis(analysis);
        }

        self.save_results(&reviews, app_info.as_ref(), analysis.as_ref())?;

        info!("\n🎉 完成！数据集已就绪，可用于情感分析");
        Ok(())
    }

    /// 模式 1：抓取最新评论
    async fn scrape_newest(&mut self) -> Result<Vec<Review>> {
        let count = self.config.newest_count;
        info!("\n📝 抓取最新 {} 条评论...", count);
        self.client.reset(None);
        Ok(self.client.fetch(None, count).await?)
    }

    /// 模式 2：抓取指定评分的评论
    async fn scrape_by_rating(&mut self) -> Result<Vec<Review>> {
        let rating: u8 = prompt_parse("请输入评分 (1-5): ")?;
        let count: usize = prompt_parse("请输入数量: ")?;
        info!("\n📝 抓取 {} 条评分为 {} 的评论...", count, rating);

        self.client.reset(Some(rating));
        let collector = self.collector();
        let reviews = collector
            .collect(&mut self.client, Some(rating), count, count.max(1))
            .await?;
        Ok(reviews)
    }

    /// 模式 3：大批量连续抓取（分页续传）
    async fn scrape_continuation(&mut self) -> Result<Vec<Review>> {
        info!("\n📝 大批量连续抓取（分页续传）...");
        self.client.reset(None);

        let mut all = Vec::new();
        for i in 0..4 {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 抓取被中断（累计 {} 条）", all.len());
                break;
            }
            info!("拉取第 {} 批...", i + 1);
            let batch = self.client.fetch(None, 1000).await?;
            if batch.is_empty() {
                break;
            }
            all.extend(batch);
            if i < 3 {
                tokio::time::sleep(Duration::from_secs(self.config.batch_delay_secs)).await;
            }
        }
        Ok(all)
    }

    /// 模式 4：均衡情感数据集
    async fn scrape_balanced(&mut self) -> Result<Vec<Review>> {
        let per_rating = self.config.balanced_per_rating;
        info!("\n📝 抓取均衡数据集（每个评分 {} 条）...", per_rating);

        let builder = DatasetBuilder::new(
            self.collector(),
            Duration::from_secs(self.config.balanced_rating_delay_secs),
            self.cancel.clone(),
        );
        let (reviews, _) = builder
            .build(&mut self.client, per_rating, per_rating)
            .await?;
        Ok(reviews)
    }

    /// 模式 5：大数据集（批量收集器 + 错误降级）
    async fn scrape_large_dataset(&mut self) -> Result<Vec<Review>> {
        let target = self.config.large_target_per_rating;
        info!("\n📝 大数据集模式");
        info!("{}", "=".repeat(50));
        info!("目标: 每个评分 {} 条（共 {} 条）", target, target * 5);
        info!("方法: 批量收集 + 失败降级重试");

        let confirm = prompt("\n确认继续? (y/n): ")?;
        if !matches!(confirm.trim().to_lowercase().as_str(), "y" | "yes") {
            warn!("❌ 已取消");
            return Ok(Vec::new());
        }

        info!("\n🚀 开始收集大数据集...");
        let builder = DatasetBuilder::new(
            self.collector(),
            Duration::from_secs(self.config.large_rating_delay_secs),
            self.cancel.clone(),
        );
        let (reviews, report) = builder
            .build(&mut self.client, target, self.config.large_batch_size)
            .await?;
        report.log_summary(target);
        Ok(reviews)
    }

    /// 按用户选择的格式持久化结果
    fn save_results(
        &self,
        reviews: &[Review],
        app_info: Option<&AppInfo>,
        analysis: Option<&ReviewAnalysis>,
    ) -> Result<()> {
        let format = prompt("💾 选择保存格式 (csv/json/both): ")?;
        let format = format.trim().to_lowercase();

        if format == "csv" || format == "both" {
            self.writer.save_csv(reviews, None)?;
        }
        if format == "json" || format == "both" {
            self.writer.save_json(reviews, None)?;
        }

        if let Some(info) = app_info {
            self.writer.save_info_json(info, "app_info.json")?;
        }
        if let Some(analysis) = analysis {
            self.writer.save_info_json(analysis, "analysis.json")?;
        }
        Ok(())
    }

    fn collector(&self) -> BatchCollector<LogReporter> {
        BatchCollector::new(
            LogReporter,
            Duration::from_secs(self.config.batch_delay_secs),
            self.cancel.clone(),
        )
    }
}

/// 安装 Ctrl-C 中断处理：置位标志，收集循环在批次之间检查
fn install_interrupt_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("\n⏹️ 收到中断信号，将在当前批次后停止...");
            cancel.cancel();
        }
    });
}

// ========== 交互辅助函数 ==========

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn prompt_parse<T>(msg: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let line = prompt(msg)?;
    line.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("输入无效: {}", e))
}

// ========== 输出辅助函数 ==========

fn print_banner(app_id: &str) {
    info!("{}", "=".repeat(60));
    info!("   🎵 Google Play 评论收集器 🎵");
    info!("{}", "=".repeat(60));
    info!("目标应用: {}", app_id);
    info!("数据将保存到 dataset 目录，用于情感分析\n");
}

fn print_app_info(info: &AppInfo) {
    info!("📱 应用信息:");
    info!("{}", "-".repeat(50));
    if let Some(title) = &info.title {
        info!("名称: {}", title);
    }
    if let Some(developer) = &info.developer {
        info!("开发者: {}", developer);
    }
    if let Some(score) = info.score {
        info!("评分: {:.1}", score);
    }
    if let Some(ratings) = info.ratings {
        info!("评分总数: {}", ratings);
    }
    if let Some(genre) = &info.genre {
        info!("分类: {}", genre);
    }
}

fn print_menu() {
    info!("\n🔧 收集模式:");
    info!("{}", "-".repeat(50));
    info!("1. 抓取最新评论");
    info!("2. 抓取指定评分的评论");
    info!("3. 大批量连续抓取");
    info!("4. 均衡情感数据集（每个评分 200 条）");
    info!("5. 大数据集（每个评分 2000 条）");
}

fn preview_reviews(reviews: &[Review]) {
    info!("\n📖 评论预览:");
    info!("{}", "-".repeat(50));
    for (i, review) in reviews.iter().take(3).enumerate() {
        let stars = "⭐".repeat(review.score as usize);
        info!("{}. {} - {}", i + 1, review.user_name, stars);
        info!("   \"{}\"", truncate_text(&review.content, 100));
        info!("   👍 {} 人觉得有用", review.thumbs_up_count);
    }
}

fn print_analysis(analysis: &ReviewAnalysis) {
    info!("\n📊 评论统计:");
    info!("{}", "-".repeat(50));
    info!("总评论数: {}", analysis.total_reviews);
    info!("平均评分: {:.2}", analysis.average_rating);
    info!("评分分布: {:?}", analysis.rating_distribution);
    info!("有点赞的评论: {}", analysis.reviews_with_thumbs_up);
    info!("有开发者回复的评论: {}", analysis.reviews_with_replies);

    info!("\n📈 情感分布:");
    info!(
        "正面 (4-5 ⭐): {} ({:.1}%)",
        analysis.positive_reviews, analysis.positive_percentage
    );
    info!(
        "中性 (3 ⭐): {} ({:.1}%)",
        analysis.neutral_reviews, analysis.neutral_percentage
    );
    info!(
        "负面 (1-2 ⭐): {} ({:.1}%)",
        analysis.negative_reviews, analysis.negative_percentage
    );
}
