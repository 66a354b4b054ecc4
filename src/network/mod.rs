pub mod browser;
pub mod client;
pub mod middleware;
pub mod policies;
pub mod service;
pub mod session;

use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::core::config::{AppConfig, FetchBackend};
use crate::core::error::Result;
use crate::interfaces::Fetcher;
use crate::network::browser::BrowserService;
use crate::network::service::HttpService;
use crate::network::session::Session;

/// 按配置选择抓取后端
pub fn build_fetcher(config: &AppConfig, session: Arc<Session>) -> Result<Arc<dyn Fetcher>> {
    let fetcher: Arc<dyn Fetcher> = match config.fetcher.backend {
        FetchBackend::Http => Arc::new(HttpService::new(&config.upstream, session)?),
        FetchBackend::Browser => Arc::new(BrowserService::new(
            config.browser.clone(),
            Url::parse(&config.upstream.base_url)?,
            session,
        )),
    };
    info!("抓取后端: {}", config.fetcher.backend);
    Ok(fetcher)
}
