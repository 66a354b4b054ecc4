//! 浏览器抓取后端
//!
//! 每次请求独立启动 (或连接) 浏览器：拦截非必要子资源、导航、读取 DOM 或页面文本，
//! 无论成功、解析失败还是超时都会释放浏览器进程。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig as LaunchConfig},
    cdp::browser_protocol::{
        emulation::SetUserAgentOverrideParams,
        fetch::{
            ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
            RequestPattern, RequestStage,
        },
        network::{CookieParam, ErrorReason, ResourceType, SetCookiesParams},
    },
};
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::{
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::config::{BrowserConfig, BrowserMode};
use crate::core::error::{Result, ScrapeError};
use crate::interfaces::fetcher::{FetchRequest, FetchResponse, Fetcher, ResponseMode};
use crate::network::session::Session;

/// 可见文本读取脚本 (JSON 端点在浏览器中以纯文本渲染)
const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

fn cdp_err(e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Browser(e.to_string())
}

/// 浏览器会话
/// 采用显式的所有权管理，确保关闭逻辑的确定性
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    /// 本地启动的进程需要关闭；远端浏览器只断开连接
    owned: bool,
}

impl BrowserSession {
    /// 启动或连接浏览器会话
    pub async fn launch(config: &BrowserConfig, ua: &str) -> Result<Self> {
        let (browser, mut handler, owned) = match config.mode {
            BrowserMode::Local => {
                let launch_config = build_launch_config(config, ua)?;
                let (browser, handler) = Browser::launch(launch_config).await.map_err(cdp_err)?;
                (browser, handler, true)
            }
            BrowserMode::Remote => {
                let endpoint = config.ws_endpoint.as_deref().ok_or_else(|| {
                    ScrapeError::Browser("remote browser mode requires browser.ws_endpoint".into())
                })?;
                let (browser, handler) = Browser::connect(endpoint).await.map_err(cdp_err)?;
                (browser, handler, false)
            }
        };

        // 启动事件循环
        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler: Some(handle),
            owned,
        })
    }

    /// 创建新页面
    pub async fn new_page(&self) -> Result<Page> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("Browser already closed".into()))?;
        browser.new_page("about:blank").await.map_err(cdp_err)
    }

    /// 优雅关闭浏览器，并等待事件循环结束
    pub async fn close(&mut self) -> Result<()> {
        let browser = self.browser.take();
        let handler = self.handler.take();

        match (browser, self.owned) {
            (Some(mut b), true) => {
                let _ = b.close().await;
                let _ = b.wait().await;
                if let Some(h) = handler {
                    let _ = h.await;
                }
            }
            _ => {
                if let Some(h) = handler {
                    h.abort();
                }
            }
        }
        Ok(())
    }
}

/// 构建本地浏览器启动参数
fn build_launch_config(config: &BrowserConfig, ua: &str) -> Result<LaunchConfig> {
    let mut builder = LaunchConfig::builder()
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua))
        .arg("--disable-infobars")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--window-size=1920,1080")
        .arg("--disable-extensions");

    if config.headless {
        builder = builder.arg("--headless=new");
    } else {
        builder = builder.with_head();
    }

    let chrome_path = if let Some(path) = &config.chrome_path {
        Some(path.clone())
    } else {
        [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| p.to_string())
    };

    if let Some(path) = chrome_path {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(ScrapeError::Browser)
}

// 在 Drop 时尝试最后一次保护 (超时取消、panic 等路径)
impl Drop for BrowserSession {
    fn drop(&mut self) {
        let handler = self.handler.take();
        if let Some(mut browser) = self.browser.take() {
            if !self.owned {
                if let Some(h) = handler {
                    h.abort();
                }
                return;
            }
            // 在后台清理
            if let Ok(rt) = tokio::runtime::Handle::try_current() {
                rt.spawn(async move {
                    let _ = browser.close().await;
                    let _ = browser.wait().await;
                    if let Some(h) = handler {
                        let _ = h.await;
                    }
                });
            }
        }
    }
}

/// 主文档状态码：优先使用 CDP 记录的导航响应
///
/// 导航响应缺失时 (如缓存命中) 才退回标题判断，且只认完整的错误页标题，
/// 避免作品名中的 "Forbidden" / "404" 被误判。
fn resolve_status(cdp_status: Option<i64>, title: &str) -> StatusCode {
    if let Some(code) = cdp_status
        .and_then(|c| u16::try_from(c).ok())
        .and_then(|c| StatusCode::from_u16(c).ok())
    {
        return code;
    }

    let title = title.trim().to_lowercase();
    match title.as_str() {
        "403 forbidden" | "forbidden" | "access denied" => StatusCode::FORBIDDEN,
        "404 not found" | "not found" | "page not found" => StatusCode::NOT_FOUND,
        t if t.starts_with("access denied |") => StatusCode::FORBIDDEN,
        _ => StatusCode::OK,
    }
}

fn is_blockable(resource: &ResourceType) -> bool {
    matches!(
        resource,
        ResourceType::Image | ResourceType::Font | ResourceType::Stylesheet | ResourceType::Media
    )
}

// =============================================================================
// BrowserService
// =============================================================================

/// 无头浏览器抓取后端
pub struct BrowserService {
    config: BrowserConfig,
    base: Url,
    session: Arc<Session>,
}

impl BrowserService {
    pub fn new(config: BrowserConfig, base: Url, session: Arc<Session>) -> Self {
        Self {
            config,
            base,
            session,
        }
    }

    /// 在单个页面上执行完整抓取流程，结束时关闭页面
    ///
    /// 超时由调用方统一控制。
    async fn run_page(
        &self,
        session: &BrowserSession,
        url: &Url,
        req: &FetchRequest,
    ) -> Result<FetchResponse> {
        let page = session.new_page().await?;
        let mut interceptor = None;

        let outcome = async {
            self.apply_identity(&page, url, req).await?;
            if self.config.block_resources {
                interceptor = Some(spawn_interceptor(&page).await?);
            }
            self.navigate_and_read(&page, url, req.mode).await
        }
        .await;

        if let Some(handle) = interceptor {
            handle.abort();
        }
        if let Err(e) = page.close().await {
            debug!("关闭页面时发生非致命错误: {}", e);
        }

        outcome
    }

    /// 注入 UA / Referer / Cookie
    async fn apply_identity(&self, page: &Page, url: &Url, req: &FetchRequest) -> Result<()> {
        let ua = self.session.get_ua();
        if !ua.is_empty() {
            let mut params = SetUserAgentOverrideParams::new(ua);
            params.accept_language = Some("en-US,en;q=0.9".into());
            page.execute(params).await.map_err(cdp_err)?;
        }

        let cookies = self
            .session
            .cookie_pairs()
            .into_iter()
            .map(|(name, value)| {
                CookieParam::builder()
                    .name(name)
                    .value(value)
                    .url(url.as_str())
                    .build()
                    .map_err(ScrapeError::Browser)
            })
            .collect::<Result<Vec<_>>>()?;
        if !cookies.is_empty() {
            page.execute(SetCookiesParams::new(cookies))
                .await
                .map_err(cdp_err)?;
        }

        if let Some(referer) = req.referer.clone().or_else(|| self.session.get_referer()) {
            let headers = chromiumoxide::cdp::browser_protocol::network::Headers::new(
                serde_json::json!({ "Referer": referer }),
            );
            page.execute(
                chromiumoxide::cdp::browser_protocol::network::SetExtraHttpHeadersParams::new(
                    headers,
                ),
            )
            .await
            .map_err(cdp_err)?;
        }

        Ok(())
    }

    /// 导航并读取 DOM 或可见文本
    async fn navigate_and_read(
        &self,
        page: &Page,
        url: &Url,
        mode: ResponseMode,
    ) -> Result<FetchResponse> {
        // goto 在主框架 load 完成后返回
        page.goto(url.as_str()).await.map_err(cdp_err)?;

        let title = page
            .get_title()
            .await
            .map_err(cdp_err)?
            .unwrap_or_default();
        let cdp_status = page
            .wait_for_navigation_response()
            .await
            .map_err(cdp_err)?
            .and_then(|req| req.response.as_ref().map(|resp| resp.status));
        let status = resolve_status(cdp_status, &title);

        let body = match mode {
            ResponseMode::Html => page.content().await.map_err(cdp_err)?,
            ResponseMode::Json => {
                // 挑战页标题会在正文里丢失，保留 HTML 供策略链识别
                if title.to_lowercase().contains("just a moment") {
                    page.content().await.map_err(cdp_err)?
                } else {
                    page.evaluate(BODY_TEXT_JS)
                        .await
                        .map_err(cdp_err)?
                        .into_value::<String>()
                        .map_err(cdp_err)?
                }
            }
        };

        let final_url = page
            .url()
            .await
            .map_err(cdp_err)?
            .unwrap_or_else(|| url.to_string());

        debug!(
            "浏览器抓取完成: {} {} (标题: {}, {} bytes)",
            status,
            final_url,
            title,
            body.len()
        );
        Ok(FetchResponse::new(final_url, status, body))
    }
}

/// 启用请求拦截：拒绝图片/字体/样式表/媒体，其余放行
async fn spawn_interceptor(page: &Page) -> Result<JoinHandle<()>> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(cdp_err)?;

    let intercept_page = page.clone();
    let handle = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let outcome = if is_blockable(&event.resource_type) {
                intercept_page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
            } else {
                intercept_page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = outcome {
                debug!("拦截请求处理失败: {}", e);
            }
        }
    });

    page.execute(
        EnableParams::builder()
            .pattern(
                RequestPattern::builder()
                    .url_pattern("*")
                    .request_stage(RequestStage::Request)
                    .build(),
            )
            .build(),
    )
    .await
    .map_err(cdp_err)?;

    Ok(handle)
}

#[async_trait]
impl Fetcher for BrowserService {
    fn name(&self) -> &str {
        "browser"
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = req.resolve(&self.base)?;
        info!("正在通过浏览器 ({}) 加载: {}", self.config.mode, url);

        // 启动/连接、建页、注入身份与导航共用同一个截止时间
        let limit = self.config.navigation_timeout();
        let deadline = Instant::now() + limit;
        let expired = || {
            warn!("浏览器抓取超时 ({:?}): {}", limit, url);
            ScrapeError::Timeout(limit)
        };

        let mut session = timeout_at(
            deadline,
            BrowserSession::launch(&self.config, &self.session.get_ua()),
        )
        .await
        .map_err(|_| expired())??;

        let result = timeout_at(deadline, self.run_page(&session, &url, req))
            .await
            .unwrap_or_else(|_| Err(expired()));

        // 关闭不计入截止时间，无论 run_page 成败都会执行
        if let Err(e) = session.close().await {
            debug!("关闭浏览器时发生非致命错误: {}", e);
        }

        result
    }
}
