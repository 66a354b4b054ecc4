//! 错误处理体系 (Error Handling System)
//!
//! 定义上游抓取相关的错误类型、阻断原因、错误分类以及全局 Result 别名。

use std::time::Duration;

use reqwest::StatusCode;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// 上游阻断原因 (Block Reasons)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// 触发 403 静态拦截
    Forbidden,
    /// 触发 Cloudflare 挑战页
    Cloudflare,
    /// 触发 429 速率限制
    RateLimit,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Forbidden => write!(f, "Forbidden(403)"),
            BlockReason::Cloudflare => write!(f, "Cloudflare"),
            BlockReason::RateLimit => write!(f, "RateLimit(429)"),
        }
    }
}

impl BlockReason {
    pub fn from_status(code: StatusCode) -> Option<Self> {
        match code {
            StatusCode::FORBIDDEN => Some(Self::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => Some(Self::RateLimit),
            _ => None,
        }
    }
}

/// 面向调用方的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Blocked,
    NotFound,
    TransportFailure,
    MalformedPayload,
    BadRequest,
    Internal,
}

/// 全局错误定义 (Scrape Domain Errors)
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Upstream timed out after {0:?}")]
    Timeout(Duration),

    /// 上游返回挑战页或封禁状态，刷新 Cookie 后可恢复
    #[error("Upstream blocked the request: {0}")]
    Blocked(BlockReason),

    #[error("Upstream resource not found: {0}")]
    NotFound(String),

    #[error("Upstream responded with HTTP {0}")]
    UpstreamStatus(StatusCode),

    #[error("Malformed upstream payload: {0}")]
    Malformed(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// 错误分类，决定端点层的响应状态
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Blocked(_) => ErrorKind::Blocked,
            ScrapeError::NotFound(_) => ErrorKind::NotFound,
            ScrapeError::Network(_)
            | ScrapeError::Middleware(_)
            | ScrapeError::Browser(_)
            | ScrapeError::Timeout(_)
            | ScrapeError::UpstreamStatus(_) => ErrorKind::TransportFailure,
            ScrapeError::Malformed(_) => ErrorKind::MalformedPayload,
            ScrapeError::InvalidRequest(_) => ErrorKind::BadRequest,
            ScrapeError::Url(_) | ScrapeError::Io(_) | ScrapeError::Config(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ScrapeError::Timeout(_) => true,
            ScrapeError::Network(e) => e.is_timeout(),
            ScrapeError::Middleware(reqwest_middleware::Error::Reqwest(e)) => e.is_timeout(),
            _ => false,
        }
    }
}
