use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::core::error::{BlockReason, Result, ScrapeError};
use crate::interfaces::fetcher::FetchResponse;
use crate::interfaces::policy::ResponsePolicy;

/// 状态码检查策略
///
/// 403/429 视为封禁，404 视为资源不存在，其余非 2xx 作为上游异常上报。
#[derive(Debug, Default)]
pub struct StatusPolicy;

impl StatusPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl ResponsePolicy for StatusPolicy {
    fn name(&self) -> &str {
        "status"
    }

    fn check(&self, resp: &FetchResponse) -> Result<()> {
        let status = resp.status;
        if status.is_success() {
            return Ok(());
        }

        if let Some(reason) = BlockReason::from_status(status) {
            warn!("检测到 {}: {}", status, resp.url);
            return Err(ScrapeError::Blocked(reason));
        }

        if status == StatusCode::NOT_FOUND {
            debug!("上游资源不存在: {}", resp.url);
            return Err(ScrapeError::NotFound(resp.url.clone()));
        }

        Err(ScrapeError::UpstreamStatus(status))
    }
}
