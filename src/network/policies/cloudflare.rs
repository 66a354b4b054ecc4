use tracing::warn;

use crate::core::error::{BlockReason, Result, ScrapeError};
use crate::interfaces::fetcher::FetchResponse;
use crate::interfaces::policy::ResponsePolicy;

/// 挑战页标题特征
const CHALLENGE_TITLE: &str = "just a moment";

/// 挑战页正文特征
///
/// 只收录挑战页独有的标记；普通页面也会注入 `/cdn-cgi/challenge-platform/scripts/jsd/`。
const CHALLENGE_FINGERPRINTS: &[&str] = &[
    "cf-browser-verification",
    "id=\"challenge-running\"",
    "/cdn-cgi/challenge-platform/h/",
];

/// Cloudflare 检查策略
#[derive(Debug, Default)]
pub struct CloudflarePolicy;

impl CloudflarePolicy {
    pub fn new() -> Self {
        Self
    }

    fn contains_cf_fingerprint(&self, resp: &FetchResponse) -> bool {
        if resp
            .title()
            .is_some_and(|t| t.to_lowercase().contains(CHALLENGE_TITLE))
        {
            return true;
        }
        CHALLENGE_FINGERPRINTS
            .iter()
            .any(|marker| resp.body.contains(marker))
    }
}

impl ResponsePolicy for CloudflarePolicy {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn check(&self, resp: &FetchResponse) -> Result<()> {
        if self.contains_cf_fingerprint(resp) {
            warn!("检测到 Cloudflare 挑战页: {}，需要刷新会话 Cookie", resp.url);
            return Err(ScrapeError::Blocked(BlockReason::Cloudflare));
        }
        Ok(())
    }
}
