//! 抓取接口定义
//!
//! 两种后端 (HTTP / 无头浏览器) 共用同一个能力集合：给定站内路径，返回响应体与状态码。

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::core::error::Result;

/// 响应体读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// 读取完整 HTML
    Html,
    /// 读取页面可见文本并按 JSON 解析 (AJAX 端点)
    Json,
}

/// 单次抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 站内路径，如 `/filter`
    pub path: String,
    /// 已编码的查询串 (不含 `?`)
    pub query: Option<String>,
    pub mode: ResponseMode,
    /// 覆盖默认 Referer
    pub referer: Option<String>,
}

impl FetchRequest {
    pub fn html(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            mode: ResponseMode::Html,
            referer: None,
        }
    }

    pub fn json(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            mode: ResponseMode::Json,
            referer: None,
        }
    }

    /// 使用 `serde_urlencoded` 编码查询参数
    pub fn with_query<T: Serialize>(mut self, query: &T) -> Self {
        self.query = serde_urlencoded::to_string(query)
            .ok()
            .filter(|q| !q.is_empty());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// 基于站点根地址构建完整 URL
    pub fn resolve(&self, base: &Url) -> Result<Url> {
        let mut url = base.join(&self.path)?;
        url.set_query(self.query.as_deref());
        Ok(url)
    }
}

/// 抓取结果
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// 提取文档 `<title>` 文本，忽略 SVG 内的同名元素 (未找到或为空返回 None)
    pub fn title(&self) -> Option<String> {
        let doc = Html::parse_document(&self.body);
        doc.select(title_selector())
            .find(|el| &*el.value().name.ns == XHTML_NS)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").unwrap())
}

/// 抓取后端能力接口
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 后端名称 (用于日志)
    fn name(&self) -> &str;

    /// 执行一次抓取，不做任何重试
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}
