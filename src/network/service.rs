use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;
use url::Url;

use crate::core::config::UpstreamConfig;
use crate::core::error::{Result, ScrapeError};
use crate::interfaces::fetcher::{FetchRequest, FetchResponse, Fetcher};
use crate::network::middleware::{RefererOverride, SessionMiddleware};
use crate::network::session::Session;

/// 直连 HTTP 抓取后端
#[derive(Clone)]
pub struct HttpService {
    client: ClientWithMiddleware,
    base: Url,
    session: Arc<Session>,
}

impl HttpService {
    pub fn new(config: &UpstreamConfig, session: Arc<Session>) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let client = Self::try_build_internal_client(config)?;
        Ok(Self {
            client,
            base,
            session,
        })
    }

    /// 构建底层的 HTTP 客户端
    fn try_build_internal_client(config: &UpstreamConfig) -> Result<ClientWithMiddleware> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true) // 禁用 Nagle 算法，降低小包延迟
            .connect_timeout(Duration::from_secs(10).min(config.timeout()))
            .timeout(config.timeout())
            .build()
            .map_err(ScrapeError::Network)?;

        Ok(ClientBuilder::new(client).with(SessionMiddleware).build())
    }
}

#[async_trait]
impl Fetcher for HttpService {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = req.resolve(&self.base)?;

        let mut rb = self
            .client
            .get(url.clone())
            .with_extension(self.session.clone());
        if let Some(referer) = &req.referer {
            rb = rb.with_extension(RefererOverride(referer.clone()));
        }

        let resp = rb.send().await.map_err(ScrapeError::Middleware)?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(ScrapeError::Network)?;

        debug!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(FetchResponse::new(final_url, status, body))
    }
}
