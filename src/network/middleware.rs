use std::sync::Arc;

use reqwest::header::{COOKIE, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::debug;

use crate::network::session::Session;

/// 单次请求的 Referer 覆盖
#[derive(Clone, Debug)]
pub struct RefererOverride(pub String);

/// 会话注入中间件
/// 负责在每次请求前，动态将 Session 中的最新 UA/Cookie/Referer 注入 Header
pub struct SessionMiddleware;

#[async_trait::async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let referer_override = extensions.get::<RefererOverride>().map(|r| r.0.clone());

        if let Some(session) = extensions.get::<Arc<Session>>() {
            let headers = req.headers_mut();

            // 先注入静态 Headers，身份字段随后覆盖
            let extra = session.get_headers();
            for (k, v) in extra.iter() {
                headers.insert(k.clone(), v.clone());
            }

            let ua = session.get_ua();
            if !ua.is_empty()
                && let Ok(val) = HeaderValue::from_str(&ua)
            {
                headers.insert(USER_AGENT, val);
            }

            if let Some(cookie) = session.get_cookie()
                && let Ok(val) = HeaderValue::from_str(&cookie)
            {
                headers.insert(COOKIE, val);
            }

            if let Some(referer) = referer_override.or_else(|| session.get_referer())
                && let Ok(val) = HeaderValue::from_str(&referer)
            {
                headers.insert(REFERER, val);
            }
        }

        debug!("GET {}", req.url());
        next.run(req, extensions).await
    }
}
