/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 目标应用的包名
    pub app_id: String,
    /// 评论语言
    pub lang: String,
    /// 评论地区
    pub country: String,
    /// 数据集根目录
    pub dataset_dir: String,
    /// 输出文件名前缀
    pub file_prefix: String,
    /// "最新评论"模式的抓取数量
    pub newest_count: usize,
    /// 均衡数据集模式下每个评分的抓取数量
    pub balanced_per_rating: usize,
    /// 大数据集模式下每个评分的目标数量
    pub large_target_per_rating: usize,
    /// 大数据集模式下每个批次的大小
    pub large_batch_size: usize,
    /// 批次之间的延迟（秒）
    pub batch_delay_secs: u64,
    /// 均衡模式下评分之间的延迟（秒）
    pub balanced_rating_delay_secs: u64,
    /// 大数据集模式下评分之间的延迟（秒）
    pub large_rating_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: "com.spotify.music".to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            dataset_dir: "dataset".to_string(),
            file_prefix: "spotify_reviews".to_string(),
            newest_count: 1000,
            balanced_per_rating: 200,
            large_target_per_rating: 2000,
            large_batch_size: 2000,
            batch_delay_secs: 2,
            balanced_rating_delay_secs: 1,
            large_rating_delay_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            app_id: std::env::var("APP_ID").unwrap_or(default.app_id),
            lang: std::env::var("REVIEW_LANG").unwrap_or(default.lang),
            country: std::env::var("REVIEW_COUNTRY").unwrap_or(default.country),
            dataset_dir: std::env::var("DATASET_DIR").unwrap_or(default.dataset_dir),
            file_prefix: std::env::var("FILE_PREFIX").unwrap_or(default.file_prefix),
            newest_count: std::env::var("NEWEST_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.newest_count),
            balanced_per_rating: std::env::var("BALANCED_PER_RATING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.balanced_per_rating),
            large_target_per_rating: std::env::var("LARGE_TARGET_PER_RATING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.large_target_per_rating),
            large_batch_size: std::env::var("LARGE_BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.large_batch_size),
            batch_delay_secs: std::env::var("BATCH_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_delay_secs),
            balanced_rating_delay_secs: std::env::var("BALANCED_RATING_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.balanced_rating_delay_secs),
            large_rating_delay_secs: std::env::var("LARGE_RATING_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.large_rating_delay_secs),
        }
    }
}
