//! 配置管理系统 (Configuration Management)
//!
//! 负责默认值、`config.toml`、环境变量三层配置的合并与反序列化。
//! 兼容旧版部署使用的 `PORT` / `BASE_URL` / `USER_AGENT` / `MANGAFIRE_COOKIE` 等变量。

use std::path::Path;
use std::time::Duration;

use bon::Builder;
use config::{Config, Environment, File};
use serde::Deserialize;
use strum::Display;

use crate::core::error::{Result, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://mangafire.to";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_COOKIE: &str = "usertype=guest;";

/// 全局应用配置
#[derive(Debug, Deserialize, Builder, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务监听配置
    #[builder(default)]
    pub server: ServerConfig,

    /// 上游站点与身份伪装配置
    #[builder(default)]
    pub upstream: UpstreamConfig,

    /// 抓取后端选择
    #[builder(default)]
    pub fetcher: FetcherConfig,

    /// 自动化浏览器 (Chromium) 相关配置
    #[builder(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Deserialize, Builder, Clone)]
#[serde(default)]
pub struct ServerConfig {
    #[builder(into, default = "0.0.0.0".to_string())]
    pub host: String,
    #[builder(default = 3000)]
    pub port: u16,
}

/// 上游站点配置 (Identity Profile)
#[derive(Debug, Deserialize, Builder, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_USER_AGENT.to_string())]
    pub user_agent: String,
    /// 会话 Cookie，被拦截时需要手动刷新
    #[builder(into, default = DEFAULT_COOKIE.to_string())]
    pub cookie: String,
    /// 自定义 Referer，缺省时使用 base_url
    #[builder(into)]
    pub referer: Option<String>,
    #[builder(default = 10)]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Builder, Clone, Default)]
#[serde(default)]
pub struct FetcherConfig {
    #[builder(default)]
    pub backend: FetchBackend,
}

/// 抓取后端
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FetchBackend {
    /// 直接 HTTP 请求
    #[default]
    Http,
    /// 无头浏览器渲染
    Browser,
}

/// 浏览器运行模式
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BrowserMode {
    /// 本地启动 Chromium 进程
    #[default]
    Local,
    /// 连接远端 (Serverless/生产环境) 浏览器的 DevTools 端点
    Remote,
}

/// 浏览器引擎配置
#[derive(Debug, Deserialize, Builder, Clone)]
#[serde(default)]
pub struct BrowserConfig {
    #[builder(default)]
    pub mode: BrowserMode,
    /// 是否以无头模式 (Headless) 运行
    #[builder(default = true)]
    pub headless: bool,
    /// 自定义可执行文件路径
    #[builder(into)]
    pub chrome_path: Option<String>,
    /// 远端模式下的 DevTools WebSocket 地址
    #[builder(into)]
    pub ws_endpoint: Option<String>,
    #[builder(default = 20)]
    pub navigation_timeout_secs: u64,
    /// 拦截图片/字体/样式表等非必要子资源
    #[builder(default = true)]
    pub block_resources: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn referer(&self) -> &str {
        self.referer.as_deref().unwrap_or(&self.base_url)
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// 旧版部署使用的环境变量 -> 配置键映射
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("BASE_URL", "upstream.base_url"),
    ("USER_AGENT", "upstream.user_agent"),
    ("MANGAFIRE_COOKIE", "upstream.cookie"),
    ("BROWSER_MODE", "browser.mode"),
    ("BROWSER_WS_ENDPOINT", "browser.ws_endpoint"),
];

impl AppConfig {
    /// 从文件系统与环境变量中加载并解析配置
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"), |key| std::env::var(key).ok())
    }

    /// 可注入环境读取函数的加载入口
    pub fn load_from<F>(config_path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MANGAFIRE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in LEGACY_ENV {
            builder = builder
                .set_override_option(*key, env(var).filter(|v| !v.is_empty()))
                .map_err(ScrapeError::Config)?;
        }

        let settings = builder.build().map_err(ScrapeError::Config)?;
        settings.try_deserialize().map_err(ScrapeError::Config)
    }
}
