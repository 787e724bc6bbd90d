//! 数据集写入服务 - 业务能力层
//!
//! 把收集结果持久化为 CSV/JSON 文件，目录结构与原始数据集一致：
//!
//! ```text
//! dataset/
//! ├── csv/    评论 CSV 文件
//! ├── json/   评论 JSON 文件
//! └── *.json  应用信息与统计结果
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::Review;

/// CSV 列头（与原始数据集字段名一致）
const CSV_HEADER: &str = "reviewId,userName,userImage,content,score,thumbsUpCount,reviewCreatedVersion,at,replyContent,replyAt,appVersion";

/// 数据集写入服务
pub struct DatasetWriter {
    dataset_dir: PathBuf,
    csv_dir: PathBuf,
    json_dir: PathBuf,
    file_prefix: String,
}

impl DatasetWriter {
    /// 创建新的写入服务
    pub fn new(dataset_dir: impl AsRef<Path>, file_prefix: impl Into<String>) -> Self {
        let dataset_dir = dataset_dir.as_ref().to_path_buf();
        Self {
            csv_dir: dataset_dir.join("csv"),
            json_dir: dataset_dir.join("json"),
            dataset_dir,
            file_prefix: file_prefix.into(),
        }
    }

    /// 创建数据集目录结构
    pub fn bootstrap(&self) -> Result<()> {
        fs::create_dir_all(&self.csv_dir)
            .with_context(|| format!("创建目录失败: {}", self.csv_dir.display()))?;
        fs::create_dir_all(&self.json_dir)
            .with_context(|| format!("创建目录失败: {}", self.json_dir.display()))?;
        Ok(())
    }

    /// 保存评论到 CSV 文件
    ///
    /// # 参数
    /// - `reviews`: 评论列表
    /// - `filename`: 文件名，None 时按时间戳生成
    ///
    /// # 返回
    /// 返回写入的文件路径
    pub fn save_csv(&self, reviews: &[Review], filename: Option<&str>) -> Result<PathBuf> {
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| self.default_filename("csv"));
        let path = self.csv_dir.join(name);

        let mut out = String::with_capacity(reviews.len() * 128 + CSV_HEADER.len());
        out.push_str(CSV_HEADER);
        out.push('\n');
        for review in reviews {
            out.push_str(&review_to_csv_row(review));
            out.push('\n');
        }

        fs::write(&path, out).with_context(|| format!("写入 CSV 失败: {}", path.display()))?;
        info!("💾 数据已保存到 {}", path.display());
        Ok(path)
    }

    /// 保存评论到 JSON 文件
    pub fn save_json(&self, reviews: &[Review], filename: Option<&str>) -> Result<PathBuf> {
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| self.default_filename("json"));
        let path = self.json_dir.join(name);

        let json = serde_json::to_string_pretty(reviews)?;
        fs::write(&path, json).with_context(|| format!("写入 JSON 失败: {}", path.display()))?;
        info!("💾 数据已保存到 {}", path.display());
        Ok(path)
    }

    /// 保存附加信息（应用信息、统计结果）到数据集根目录
    pub fn save_info_json<T: Serialize>(&self, value: &T, filename: &str) -> Result<PathBuf> {
        let path = self.dataset_dir.join(filename);

        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("写入 JSON 失败: {}", path.display()))?;
        info!("💾 数据已保存到 {}", path.display());
        Ok(path)
    }

    fn default_filename(&self, ext: &str) -> String {
        format!(
            "{}_{}.{}",
            self.file_prefix,
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            ext
        )
    }
}

/// CSV 字段转义：含逗号、引号或换行时整体加引号
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn review_to_csv_row(review: &Review) -> String {
    let opt = |value: &Option<String>| csv_escape(value.as_deref().unwrap_or(""));

    [
        csv_escape(&review.review_id),
        csv_escape(&review.user_name),
        opt(&review.user_image),
        csv_escape(&review.content),
        review.score.to_string(),
        review.thumbs_up_count.to_string(),
        opt(&review.review_created_version),
        review.at.to_rfc3339(),
        opt(&review.reply_content),
        review
            .reply_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        opt(&review.app_version),
    ]
    .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn review(id: &str, content: &str) -> Review {
        Review {
            review_id: id.to_string(),
            user_name: "Alice".to_string(),
            user_image: None,
            content: content.to_string(),
            score: 5,
            thumbs_up_count: 1,
            review_created_version: None,
            at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            reply_content: None,
            reply_at: None,
            app_version: Some("8.9.40".to_string()),
        }
    }

    fn temp_writer(tag: &str) -> DatasetWriter {
        let dir = std::env::temp_dir().join(format!(
            "review_dataset_test_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        DatasetWriter::new(dir, "test_reviews")
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_save_csv_writes_header_and_rows() {
        let writer = temp_writer("csv");
        writer.bootstrap().unwrap();

        let reviews = vec![review("1", "great, really"), review("2", "ok")];
        let path = writer.save_csv(&reviews, Some("out.csv")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,Alice,,\"great, really\",5,1,"));
        assert!(lines[2].starts_with("2,Alice,,ok,5,1,"));
    }

    #[test]
    fn test_save_json_round_trips() {
        let writer = temp_writer("json");
        writer.bootstrap().unwrap();

        let reviews = vec![review("1", "nice")];
        let path = writer.save_json(&reviews, Some("out.json")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Review> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, reviews);
    }

    #[test]
    fn test_save_info_json_lands_in_dataset_root() {
        let writer = temp_writer("info");
        writer.bootstrap().unwrap();

        let path = writer
            .save_info_json(&serde_json::json!({"total": 3}), "analysis.json")
            .unwrap();

        assert_eq!(path.parent().unwrap(), writer.dataset_dir.as_path());
        assert!(path.exists());
    }
}
