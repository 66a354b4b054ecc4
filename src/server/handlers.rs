use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::error::Result;
use crate::core::model::{
    ChapterImages, ChapterList, FilterPage, Filters, MangaDetail, ReadChapter, RecentPage,
    SearchPage, TrendingPage,
};

use super::AppState;

/// 页码参数，非法或缺省时回落到第 1 页
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> u32 {
        parse_page(self.page.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(rename = "type")]
    kind: Option<String>,
    genre: Option<String>,
    status: Option<String>,
    page: Option<String>,
}

fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.site.base().as_str(),
        "backend": state.backend,
        "endpoints": {
            "search": "/api/search?q={query}&page={page}",
            "trending": "/api/trending",
            "recent": "/api/recent?page={page}",
            "manga": "/api/manga/{id}",
            "chapters": "/api/manga/{id}/chapters/{lang}",
            "chapterImages": "/api/chapter/{chapterId}",
            "read": "/api/read/{mangaId}/{chapterId}",
            "filter": "/api/filter?type={type}&genre={genre}&status={status}&page={page}",
            "health": "/health",
        },
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>> {
    let query = params.q.unwrap_or_default();
    let page = parse_page(params.page.as_deref());
    Ok(Json(state.site.search(&query, page).await?))
}

pub async fn trending(State(state): State<AppState>) -> Result<Json<TrendingPage>> {
    Ok(Json(state.site.trending().await?))
}

pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<RecentPage>> {
    Ok(Json(state.site.recent(params.page()).await?))
}

pub async fn manga(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MangaDetail>> {
    Ok(Json(state.site.manga(&id).await?))
}

pub async fn chapters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChapterList>> {
    Ok(Json(state.site.chapters(&id, None).await?))
}

pub async fn chapters_in(
    State(state): State<AppState>,
    Path((id, lang)): Path<(String, String)>,
) -> Result<Json<ChapterList>> {
    Ok(Json(state.site.chapters(&id, Some(&lang)).await?))
}

pub async fn chapter_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChapterImages>> {
    Ok(Json(state.site.chapter_images(&id).await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path((manga_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<ReadChapter>> {
    Ok(Json(state.site.read(&manga_id, &chapter_id).await?))
}

pub async fn filter(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<FilterPage>> {
    let page = parse_page(params.page.as_deref());
    let filters = Filters {
        kind: params.kind,
        genre: params.genre,
        status: params.status,
    };
    Ok(Json(state.site.filter(filters, page).await?))
}
