//! HTTP 接口层 (Router)
//!
//! 路由注册、共享状态以及服务生命周期。错误在端点边界统一转换为 JSON 响应。

mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::config::ServerConfig;
use crate::core::error::Result;
use crate::sites::mangafire::MangaFire;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<MangaFire>,
    /// 当前抓取后端名称，仅用于信息展示
    pub backend: String,
}

impl AppState {
    pub fn new(site: Arc<MangaFire>) -> Self {
        let backend = site.client().backend().to_string();
        Self { site, backend }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/search", get(handlers::search))
        .route("/api/trending", get(handlers::trending))
        .route("/api/recent", get(handlers::recent))
        .route("/api/manga/{id}", get(handlers::manga))
        .route("/api/manga/{id}/chapters", get(handlers::chapters))
        .route("/api/manga/{id}/chapters/{lang}", get(handlers::chapters_in))
        .route("/api/chapter/{id}", get(handlers::chapter_images))
        .route("/api/read/{manga_id}/{chapter_id}", get(handlers::read))
        .route("/api/filter", get(handlers::filter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 绑定端口并运行，收到 Ctrl-C 后优雅退出
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "服务已启动: http://{} (后端: {})",
        listener.local_addr()?,
        state.backend
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("收到退出信号，正在关闭服务");
        })
        .await?;

    Ok(())
}
