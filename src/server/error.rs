use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::core::error::{ErrorKind, ScrapeError};

impl ScrapeError {
    /// 错误分类到 HTTP 状态码的映射
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Blocked => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::TransportFailure if self.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::TransportFailure | ErrorKind::MalformedPayload => StatusCode::BAD_GATEWAY,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        match kind {
            ErrorKind::Internal => error!("{}", self),
            ErrorKind::Blocked => warn!("上游拦截: {}", self),
            _ => warn!("[{}] {}", kind, self),
        }

        let body = json!({
            "error": self.to_string(),
            "kind": kind.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
