use crate::core::error::Result;
use crate::interfaces::fetcher::FetchResponse;

/// 响应策略接口
///
/// - 策略负责：识别挑战页、封禁、缺失等异常响应，并转换为对应的错误类型。
/// - 策略不负责：不负责重试，也不修复会话环境。
pub trait ResponsePolicy: Send + Sync + std::fmt::Debug {
    /// 策略名称 (用于调试/日志)
    fn name(&self) -> &str;

    /// 检查响应，通过返回 Ok(())
    fn check(&self, resp: &FetchResponse) -> Result<()>;
}
