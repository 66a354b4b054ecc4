//! MangaFire 抓取 JSON API
//!
//! 将站点 HTML / AJAX 响应解析为结构化 JSON，抓取后端可在 HTTP 与无头浏览器之间切换。

pub mod core;
pub mod interfaces;
pub mod network;
pub mod server;
pub mod sites;
pub mod utils;
