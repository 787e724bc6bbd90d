//! Google Play 评论客户端
//!
//! 封装商店 batchexecute 接口的调用与解析逻辑：
//! - 构造 `UsvDTd` 请求体（首页与带分页 token 两种形态）
//! - 去掉 `)]}'` 前缀后做两层 JSON 解码
//! - 按位置索引把评论条目映射为 [`Review`]
//! - 内部管理每个评分过滤条件的分页续传状态
//!
//! 单条评论解析失败时跳过该条，绝不 panic。

use std::collections::HashMap;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AppInfo, Review};

/// 单次 HTTP 请求最多返回的评论数（接口上限）
const MAX_PER_REQUEST: usize = 199;

const BATCHEXECUTE_URL: &str = "https://play.google.com/_/PlayStoreUi/data/batchexecute";
const DETAILS_URL: &str = "https://play.google.com/store/apps/details";

/// 评论排序方式（取值与商店接口一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    MostRelevant = 1,
    Newest = 2,
    Rating = 3,
}

impl Sort {
    fn code(self) -> u8 {
        self as u8
    }
}

/// 评论来源能力
///
/// 收集器只依赖该接口。`count` 是本次调用的数量上限，
/// 实际返回可能更少；数据源耗尽时返回空列表而不是错误。
pub trait ReviewSource {
    /// 拉取最多 `count` 条评论，`rating` 为 None 时不过滤评分
    #[allow(async_fn_in_trait)]
    async fn fetch(&mut self, rating: Option<u8>, count: usize) -> Result<Vec<Review>>;
}

/// 分页续传状态
#[derive(Debug, Clone, Default)]
enum Continuation {
    #[default]
    Fresh,
    Next(String),
    Exhausted,
}

/// Google Play 评论客户端
pub struct PlayStoreClient {
    http: reqwest::Client,
    app_id: String,
    lang: String,
    country: String,
    sort: Sort,
    /// 每个评分过滤条件各自的分页状态
    tokens: HashMap<Option<u8>, Continuation>,
}

impl PlayStoreClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_id: config.app_id.clone(),
            lang: config.lang.clone(),
            country: config.country.clone(),
            sort: Sort::Newest,
            tokens: HashMap::new(),
        }
    }

    /// 设置评论排序方式
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// 重置某个评分过滤条件的分页状态，下次 fetch 从头开始
    pub fn reset(&mut self, rating: Option<u8>) {
        self.tokens.remove(&rating);
    }

    /// 获取应用基本信息
    ///
    /// 抓取商店详情页并解析其中内嵌的 JSON-LD 数据块
    pub async fn get_app_info(&self) -> Result<AppInfo> {
        let url = format!(
            "{}?id={}&hl={}&gl={}",
            DETAILS_URL, self.app_id, self.lang, self.country
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&url, e))?;

        if !resp.status().is_success() {
            return Err(AppError::bad_status(&url, resp.status().as_u16()));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| AppError::request_failed(&url, e))?;

        parse_app_info(&html).ok_or_else(|| AppError::empty_response(&url))
    }

    /// 请求一页评论，返回该页的评论与下一页 token
    async fn request_page(
        &self,
        rating: Option<u8>,
        count: usize,
        token: Option<&str>,
    ) -> Result<(Vec<Review>, Option<String>)> {
        let url = format!("{}?hl={}&gl={}", BATCHEXECUTE_URL, self.lang, self.country);
        let body = build_request_body(&self.app_id, self.sort, count, rating, token);

        let resp = self
            .http
            .post(&url)
            .header(
                "content-type",
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&url, e))?;

        if !resp.status().is_success() {
            return Err(AppError::bad_status(&url, resp.status().as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| AppError::request_failed(&url, e))?;

        parse_reviews_payload(&text)
    }
}

impl ReviewSource for PlayStoreClient {
    /// 拉取最多 `count` 条评论
    ///
    /// 单次 HTTP 请求最多取 [`MAX_PER_REQUEST`] 条，不足时用分页
    /// token 继续请求。续传状态跨 fetch 调用保留，连续调用会从
    /// 上一次停下的位置继续。
    async fn fetch(&mut self, rating: Option<u8>, count: usize) -> Result<Vec<Review>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        loop {
            let state = self.tokens.entry(rating).or_default().clone();
            let token = match &state {
                Continuation::Fresh => None,
                Continuation::Next(t) => Some(t.as_str()),
                Continuation::Exhausted => break,
            };

            let want = (count - out.len()).min(MAX_PER_REQUEST);
            let (mut page, next) = self.request_page(rating, want, token).await?;
            let got = page.len();
            out.append(&mut page);

            let exhausted = next.is_none();
            self.tokens.insert(
                rating,
                match next {
                    Some(t) => Continuation::Next(t),
                    None => Continuation::Exhausted,
                },
            );

            if got == 0 || exhausted || out.len() >= count {
                break;
            }
        }

        debug!("已拉取 {} 条评论（评分过滤: {:?}）", out.len(), rating);
        Ok(out)
    }
}

/// 构造 batchexecute 请求体
///
/// 请求体是 `f.req=[[["UsvDTd","<内层载荷>",null,"generic"]]]`，
/// 其中内层载荷本身是一个 JSON 字符串
fn build_request_body(
    app_id: &str,
    sort: Sort,
    count: usize,
    rating: Option<u8>,
    token: Option<&str>,
) -> String {
    let score = match rating {
        Some(r) => r.to_string(),
        None => "null".to_string(),
    };

    let inner = match token {
        None => format!(
            "[null,null,[2,{},[{},null,null],null,[null,{}]],[\"{}\",7]]",
            sort.code(),
            count,
            score,
            app_id
        ),
        Some(t) => format!(
            "[null,null,[2,{},[{},null,\"{}\"],null,[null,{}]],[\"{}\",7]]",
            sort.code(),
            count,
            t,
            score,
            app_id
        ),
    };

    // 内层载荷含引号，借助 serde_json 转成 JSON 字符串字面量
    let quoted = serde_json::to_string(&inner).unwrap_or_default();
    format!("f.req=[[[\"UsvDTd\",{},null,\"generic\"]]]", quoted)
}

/// 解析 batchexecute 响应，返回评论列表与下一页 token
fn parse_reviews_payload(text: &str) -> Result<(Vec<Review>, Option<String>)> {
    // 响应以反 XSSI 前缀 )]}' 开头
    let stripped = text.trim_start_matches(")]}'").trim_start();
    let outer: Value = serde_json::from_str(stripped)?;

    let payload = outer
        .get(0)
        .and_then(|v| v.get(2))
        .and_then(Value::as_str);

    let payload = match payload {
        Some(p) if !p.is_empty() => p,
        _ => return Ok((Vec::new(), None)),
    };

    let inner: Value = serde_json::from_str(payload)?;

    let reviews = inner
        .get(0)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_review_entry).collect())
        .unwrap_or_default();

    let token = inner
        .as_array()
        .and_then(|a| a.last())
        .and_then(|v| v.get(1))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok((reviews, token))
}

/// 按位置索引解析单条评论
///
/// 索引布局与 google-play-scraper 一致：
/// id `[0]`、用户名 `[1][0]`、头像 `[1][1][3][2]`、评分 `[2]`、
/// 内容 `[4]`、时间 `[5][0]`、点赞 `[6]`、回复 `[7][1]` / `[7][2][0]`、
/// 版本 `[10]`。必要字段缺失或类型不符时返回 None。
fn parse_review_entry(item: &Value) -> Option<Review> {
    let review_id = item.get(0)?.as_str()?.to_string();

    let score = item.get(2).and_then(Value::as_u64)?;
    if !(1..=5).contains(&score) {
        debug!("跳过评分异常的评论: {} (score={})", review_id, score);
        return None;
    }

    let at = item
        .get(5)
        .and_then(|v| v.get(0))
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))?;

    let user_name = item
        .get(1)
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let user_image = item
        .get(1)
        .and_then(|v| v.get(1))
        .and_then(|v| v.get(3))
        .and_then(|v| v.get(2))
        .and_then(Value::as_str)
        .map(str::to_string);

    let content = item
        .get(4)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let thumbs_up_count = item.get(6).and_then(Value::as_u64).unwrap_or(0) as u32;

    let reply_content = item
        .get(7)
        .and_then(|v| v.get(1))
        .and_then(Value::as_str)
        .map(str::to_string);

    let reply_at = item
        .get(7)
        .and_then(|v| v.get(2))
        .and_then(|v| v.get(0))
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    // 接口只在 [10] 提供一个版本号，两个版本字段共用它
    let version = item.get(10).and_then(Value::as_str).map(str::to_string);

    Some(Review {
        review_id,
        user_name,
        user_image,
        content,
        score: score as u8,
        thumbs_up_count,
        review_created_version: version.clone(),
        at,
        reply_content,
        reply_at,
        app_version: version,
    })
}

/// 从商店详情页 HTML 中解析 JSON-LD 应用信息
fn parse_app_info(html: &str) -> Option<AppInfo> {
    let re = Regex::new(r#"(?s)<script type="application/ld\+json"[^>]*>(.*?)</script>"#).ok()?;
    let block = re.captures(html)?.get(1)?.as_str();
    let ld: Value = serde_json::from_str(block.trim()).ok()?;

    let price = ld
        .get("offers")
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("price"))
        .and_then(value_as_string);

    let free = price.as_deref().map(|p| p == "0" || p == "0.0");

    Some(AppInfo {
        title: ld.get("name").and_then(value_as_string),
        developer: ld
            .get("author")
            .and_then(|a| a.get("name"))
            .and_then(value_as_string),
        score: ld
            .get("aggregateRating")
            .and_then(|r| r.get("ratingValue"))
            .and_then(value_as_f64),
        ratings: ld
            .get("aggregateRating")
            .and_then(|r| r.get("ratingCount"))
            .and_then(value_as_u64),
        genre: ld.get("applicationCategory").and_then(value_as_string),
        content_rating: ld.get("contentRating").and_then(value_as_string),
        price,
        free,
        description: ld.get("description").and_then(value_as_string),
    })
}

// JSON-LD 中数值字段有时以字符串形式出现

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn value_as_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 构造一条与接口布局一致的评论条目
    fn review_entry(id: &str, score: u64) -> Value {
        json!([
            id,
            ["Alice", [null, null, null, [null, null, "https://img.example/a.png"]]],
            score,
            null,
            "Great app, works offline too",
            [1_700_000_000],
            12,
            [null, "Thanks for the feedback!", [1_700_000_500]],
            null,
            null,
            "8.9.40"
        ])
    }

    /// 把内层载荷包进 batchexecute 的响应信封
    fn wrap_payload(inner: &Value) -> String {
        let payload = serde_json::to_string(inner).unwrap();
        let outer = json!([["wrb.fr", "UsvDTd", payload, null, null, null, "generic"]]);
        format!(")]}}'\n\n{}", serde_json::to_string(&outer).unwrap())
    }

    #[test]
    fn test_parse_reviews_payload() {
        let inner = json!([
            [review_entry("gp:1", 5), review_entry("gp:2", 4)],
            [null, "NEXT_TOKEN"]
        ]);
        let text = wrap_payload(&inner);

        let (reviews, token) = parse_reviews_payload(&text).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(token.as_deref(), Some("NEXT_TOKEN"));

        let first = &reviews[0];
        assert_eq!(first.review_id, "gp:1");
        assert_eq!(first.user_name, "Alice");
        assert_eq!(first.score, 5);
        assert_eq!(first.content, "Great app, works offline too");
        assert_eq!(first.thumbs_up_count, 12);
        assert_eq!(first.at.timestamp(), 1_700_000_000);
        assert_eq!(first.reply_content.as_deref(), Some("Thanks for the feedback!"));
        assert_eq!(first.reply_at.unwrap().timestamp(), 1_700_000_500);
        assert_eq!(first.app_version.as_deref(), Some("8.9.40"));
        assert_eq!(first.review_created_version.as_deref(), Some("8.9.40"));
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        // 第二条缺少 id，第三条评分超出范围
        let inner = json!([
            [
                review_entry("gp:1", 3),
                json!([null, ["Bob"], 4, null, "no id", [1_700_000_000], 0]),
                review_entry("gp:3", 9)
            ],
            [null, null]
        ]);
        let text = wrap_payload(&inner);

        let (reviews, token) = parse_reviews_payload(&text).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].review_id, "gp:1");
        assert!(token.is_none());
    }

    #[test]
    fn test_parse_empty_payload() {
        let outer = json!([["wrb.fr", "UsvDTd", null, null, null, null, "generic"]]);
        let text = format!(")]}}'\n\n{}", serde_json::to_string(&outer).unwrap());

        let (reviews, token) = parse_reviews_payload(&text).unwrap();
        assert!(reviews.is_empty());
        assert!(token.is_none());
    }

    #[test]
    fn test_build_request_body_first_page() {
        let body = build_request_body("com.spotify.music", Sort::Newest, 100, Some(5), None);
        assert!(body.starts_with("f.req=[[[\"UsvDTd\","));
        assert!(body.contains("com.spotify.music"));
        assert!(body.contains("[2,2,[100,null,null],null,[null,5]]"));
    }

    #[test]
    fn test_build_request_body_with_token() {
        let body = build_request_body("com.spotify.music", Sort::Newest, 50, None, Some("TOK123"));
        assert!(body.contains("TOK123"));
        assert!(body.contains("null"));
    }

    #[test]
    fn test_parse_app_info_from_ld_json() {
        let html = r#"<html><head>
            <script type="application/ld+json" nonce="x">
            {"name":"Spotify: Music and Podcasts",
             "author":{"name":"Spotify AB"},
             "aggregateRating":{"ratingValue":"4.4","ratingCount":"30000000"},
             "applicationCategory":"MUSIC_AND_AUDIO",
             "contentRating":"Teen",
             "offers":[{"price":"0"}],
             "description":"Listen to music."}
            </script></head><body></body></html>"#;

        let info = parse_app_info(html).unwrap();
        assert_eq!(info.title.as_deref(), Some("Spotify: Music and Podcasts"));
        assert_eq!(info.developer.as_deref(), Some("Spotify AB"));
        assert_eq!(info.score, Some(4.4));
        assert_eq!(info.ratings, Some(30_000_000));
        assert_eq!(info.genre.as_deref(), Some("MUSIC_AND_AUDIO"));
        assert_eq!(info.free, Some(true));
    }

    #[test]
    fn test_parse_app_info_missing_block() {
        assert!(parse_app_info("<html><body>nothing here</body></html>").is_none());
    }
}
