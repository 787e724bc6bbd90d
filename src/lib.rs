//! # Spotify Review Scraper
//!
//! 从 Google Play 商店收集应用评论并持久化为 CSV/JSON 数据集的工具，
//! 为下游情感分析练习提供数据。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/play` - Google Play batchexecute 接口封装
//! - `ReviewSource` - 评论来源能力抽象，收集器只依赖该接口
//!
//! ### ② 业务能力层（Services）
//! - `services/collector` - 批量收集循环（去重、半量重试、限速）
//! - `services/analyzer` - 描述性统计（评分分布、情感分桶）
//! - `services/dataset_writer` - CSV/JSON 数据集持久化
//! - `services/progress` - 收集进度上报接口
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/dataset_builder` - 按评分 1-5 编排收集器，汇总统计
//! - `app` - 菜单驱动的应用入口，管理资源与中断
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{PlayStoreClient, ReviewSource, Sort};
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{AppInfo, Review, ReviewAnalysis};
pub use orchestrator::{DatasetBuilder, RatingReport};
pub use services::collector::{BatchCollector, CancelFlag};
