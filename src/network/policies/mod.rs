mod cloudflare;
mod status;

use std::sync::Arc;

use crate::interfaces::ResponsePolicy;

pub use self::cloudflare::CloudflarePolicy;
pub use self::status::StatusPolicy;

/// 默认策略链：先识别挑战页，再检查状态码
pub fn default_policies() -> Vec<Arc<dyn ResponsePolicy>> {
    vec![Arc::new(CloudflarePolicy::new()), Arc::new(StatusPolicy::new())]
}
