use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN};

use crate::core::config::UpstreamConfig;

/// 身份伪装信息 (Identity Profile)
///
/// 两种抓取后端共享同一份 UA / Cookie / Referer。
#[derive(Debug, Default)]
pub struct Session {
    pub ua: Arc<RwLock<String>>,
    pub cookie: Arc<RwLock<Option<String>>>,
    pub referer: Arc<RwLock<Option<String>>>,
    pub extra_headers: Arc<RwLock<HeaderMap>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据上游配置构建会话
    pub fn from_config(cfg: &UpstreamConfig) -> Self {
        let session = Self::new();
        session.set_ua(cfg.user_agent.clone());
        session.set_cookie(cfg.cookie.clone());
        session.set_referer(cfg.referer().to_string());
        session.set_headers(browser_headers(&cfg.base_url));
        session
    }

    pub fn set_ua(&self, ua: String) {
        *self.ua.write() = ua;
    }

    pub fn set_cookie(&self, cookie: String) {
        *self.cookie.write() = Some(cookie).filter(|c| !c.trim().is_empty());
    }

    pub fn set_referer(&self, referer: String) {
        *self.referer.write() = Some(referer).filter(|r| !r.is_empty());
    }

    pub fn set_headers(&self, headers: HeaderMap) {
        *self.extra_headers.write() = headers;
    }

    pub fn get_ua(&self) -> String {
        self.ua.read().clone()
    }

    pub fn get_cookie(&self) -> Option<String> {
        self.cookie.read().clone()
    }

    pub fn get_referer(&self) -> Option<String> {
        self.referer.read().clone()
    }

    pub fn get_headers(&self) -> HeaderMap {
        self.extra_headers.read().clone()
    }

    /// 将 Cookie 串拆分为 (name, value) 对，供浏览器注入
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.get_cookie()
            .map(|raw| {
                raw.split(';')
                    .filter_map(|part| {
                        let (name, value) = part.trim().split_once('=')?;
                        let name = name.trim();
                        (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 模拟浏览器 XHR 的静态请求头
fn browser_headers(base_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    if let Ok(origin) = HeaderValue::from_str(base_url.trim_end_matches('/')) {
        headers.insert(ORIGIN, origin);
    }
    headers
}
