use serde::{Deserialize, Serialize};

/// 列表页条目 (搜索 / 热门 / 最近更新 / 筛选)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub detail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_chapter: Option<String>,
}

/// 漫画详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaDetail {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
    pub description: String,
    pub genres: Vec<String>,
    pub author: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_titles: Vec<String>,
}

/// 章节信息
///
/// `id` 为站内章节编号 (来自 `data-id`)，与 URL 中的 slug 不是一回事。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    pub number: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// 单页图片，`page` 从 1 开始
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub page: usize,
    pub image: String,
}

impl PageImage {
    /// 按顺序为图片编号
    pub fn numbered(urls: Vec<String>) -> Vec<PageImage> {
        urls.into_iter()
            .enumerate()
            .map(|(i, image)| PageImage { page: i + 1, image })
            .collect()
    }
}

/// 列表页解析结果
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<SearchResult>,
    pub has_next_page: bool,
}

/// 阅读页解析结果
#[derive(Debug, Clone, Default)]
pub struct ReaderPage {
    pub title: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub query: String,
    pub page: u32,
    pub results: Vec<SearchResult>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingPage {
    pub trending: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPage {
    pub page: u32,
    pub recent: Vec<SearchResult>,
    pub has_next_page: bool,
}

/// 筛选条件，同时用作上游查询串
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPage {
    pub filters: Filters,
    pub page: u32,
    pub results: Vec<SearchResult>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterList {
    pub manga_id: String,
    pub language: String,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterImages {
    pub chapter_id: String,
    pub pages: Vec<PageImage>,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadChapter {
    pub manga_id: String,
    pub chapter_id: String,
    pub title: String,
    pub url: String,
    pub pages: Vec<PageImage>,
    pub total_pages: usize,
}
