//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、遥测层初始化、依赖注入及服务生命周期管理。

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;

use mangafire_api::core::config::{AppConfig, FetchBackend};
use mangafire_api::interfaces::{FetchRequest, SiteClient};
use mangafire_api::network::build_fetcher;
use mangafire_api::network::policies::default_policies;
use mangafire_api::network::session::Session;
use mangafire_api::server::{self, AppState};
use mangafire_api::sites::mangafire::MangaFire;

/// 探测模式下打印的响应体长度上限 (字符)
const PREVIEW_CHARS: usize = 600;

/// 命令行界面脚手架 (CLI Scaffolding)
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 JSON API 服务 (默认)
    Serve {
        /// 监听端口
        #[arg(short, long)]
        port: Option<u16>,
        /// 抓取后端
        #[arg(short, long, value_enum)]
        backend: Option<FetchBackend>,
        /// 覆盖会话 Cookie
        #[arg(long)]
        cookie: Option<String>,
    },
    /// 通过当前后端与策略链抓取单个站内路径，用于排查 Cookie 是否失效
    Probe {
        /// 站内路径，如 `/home` 或 `/filter?keyword=naruto`
        path: String,
        /// 以 JSON 方式读取 (AJAX 端点)
        #[arg(long)]
        json: bool,
        /// 抓取后端
        #[arg(short, long, value_enum)]
        backend: Option<FetchBackend>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 遥测层初始化 (Telemetry Layer Initialization)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load()?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        backend: None,
        cookie: None,
    }) {
        Commands::Serve {
            port,
            backend,
            cookie,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(backend) = backend {
                config.fetcher.backend = backend;
            }
            if let Some(cookie) = cookie {
                config.upstream.cookie = cookie;
            }

            let site = Arc::new(build_site(&config)?);
            info!("上游站点: {}", site.base());
            server::serve(&config.server, AppState::new(site)).await?;
        }
        Commands::Probe {
            path,
            json,
            backend,
        } => {
            if let Some(backend) = backend {
                config.fetcher.backend = backend;
            }
            probe(&config, &path, json).await?;
        }
    }

    Ok(())
}

/// 依赖项初始化与注入 (Dependency Injection)
fn build_site(config: &AppConfig) -> anyhow::Result<MangaFire> {
    let session = Arc::new(Session::from_config(&config.upstream));
    let fetcher = build_fetcher(config, session)?;
    Ok(MangaFire::new(Url::parse(&config.upstream.base_url)?, fetcher))
}

async fn probe(config: &AppConfig, target: &str, json: bool) -> anyhow::Result<()> {
    let session = Arc::new(Session::from_config(&config.upstream));
    let client = SiteClient::new(build_fetcher(config, session)?, default_policies());

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };
    let mut req = if json {
        FetchRequest::json(path)
    } else {
        FetchRequest::html(path)
    };
    req.query = query.filter(|q| !q.is_empty());

    let resp = client.get(&req).await?;
    let preview: String = resp.body.chars().take(PREVIEW_CHARS).collect();

    println!("[{}] {} {}", client.backend(), resp.status, resp.url);
    if let Some(title) = resp.title() {
        println!("title: {}", title);
    }
    println!("{} bytes\n{}", resp.body.len(), preview);
    Ok(())
}
