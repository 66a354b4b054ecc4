use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{Result, ScrapeError};
use crate::interfaces::{FetchRequest, FetchResponse, Fetcher, ResponsePolicy};

/// 面向站点的抓取客户端封装
///
/// 组合一个抓取后端与策略链；每次调用只发起一次上游请求。
#[derive(Clone)]
pub struct SiteClient {
    pub fetcher: Arc<dyn Fetcher>,
    pub policies: Vec<Arc<dyn ResponsePolicy>>,
}

impl SiteClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, policies: Vec<Arc<dyn ResponsePolicy>>) -> Self {
        Self { fetcher, policies }
    }

    /// 执行请求并运行策略链
    pub async fn get(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let resp = self.fetcher.fetch(req).await?;
        for policy in &self.policies {
            policy.check(&resp)?;
        }
        debug!(
            "[{}] {} {} 通过 {} 条策略",
            self.fetcher.name(),
            resp.status,
            resp.url,
            self.policies.len()
        );
        Ok(resp)
    }

    /// 获取文本内容
    pub async fn get_text(&self, req: &FetchRequest) -> Result<String> {
        Ok(self.get(req).await?.body)
    }

    /// 获取 JSON 内容
    pub async fn get_json<T: DeserializeOwned>(&self, req: &FetchRequest) -> Result<T> {
        let body = self.get_text(req).await?;
        serde_json::from_str(body.trim()).map_err(|e| {
            ScrapeError::Malformed(format!("expected JSON from {}: {}", req.path, e))
        })
    }

    pub fn backend(&self) -> &str {
        self.fetcher.name()
    }
}
