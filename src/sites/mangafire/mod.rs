//! MangaFire 站点实现
//!
//! 每个公开操作恰好发起一次上游请求，再交给解析器与规整函数处理。

pub mod extractor;
pub mod normalizer;
mod selectors;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::error::{Result, ScrapeError};
use crate::core::model::{
    ChapterImages, ChapterList, FilterPage, Filters, MangaDetail, PageImage, ReadChapter,
    RecentPage, SearchPage, TrendingPage,
};
use crate::interfaces::{FetchRequest, Fetcher, SiteClient};
use crate::network::policies::default_policies;
use crate::utils::to_absolute_url;

pub use extractor::{ListingLayout, MangaFireExtractor};
pub(crate) use selectors::SiteSelectors;

use normalizer::{ajax_html, ajax_images, manga_code, path_segment, resolve_all};

/// 章节列表默认语言
pub const DEFAULT_LANGUAGE: &str = "en";

/// 上游查询串：`keyword` 与 `page`
#[derive(serde::Serialize)]
struct SearchQuery<'a> {
    keyword: &'a str,
    page: u32,
}

/// 筛选查询串，未设置的条件不出现在 URL 中
#[derive(serde::Serialize)]
struct FilterQuery<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    page: u32,
}

pub struct MangaFire {
    base: Url,
    client: SiteClient,
    extractor: MangaFireExtractor,
}

impl MangaFire {
    pub fn new(base: Url, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            client: SiteClient::new(fetcher, default_policies()),
            extractor: MangaFireExtractor::new(base.clone()),
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn client(&self) -> &SiteClient {
        &self.client
    }

    /// 关键词搜索
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let keyword = query.trim();
        if keyword.is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "Query parameter \"q\" is required".into(),
            ));
        }
        let page = page.max(1);

        let req = FetchRequest::html("/filter").with_query(&SearchQuery { keyword, page });
        let html = self.client.get_text(&req).await?;
        let listing = self.extractor.parse_listing(&html, ListingLayout::Filter);

        info!("搜索 {:?} 第 {} 页: {} 条", keyword, page, listing.items.len());
        Ok(SearchPage {
            query: keyword.to_string(),
            page,
            results: listing.items,
            has_next_page: listing.has_next_page,
        })
    }

    /// 首页热门
    pub async fn trending(&self) -> Result<TrendingPage> {
        let html = self.client.get_text(&FetchRequest::html("/home")).await?;
        let listing = self.extractor.parse_listing(&html, ListingLayout::Trending);
        info!("热门: {} 条", listing.items.len());
        Ok(TrendingPage {
            trending: listing.items,
        })
    }

    /// 最近更新
    pub async fn recent(&self, page: u32) -> Result<RecentPage> {
        let page = page.max(1);
        let html = self
            .client
            .get_text(&FetchRequest::html(format!("/recent/{}", page)))
            .await?;
        let listing = self.extractor.parse_listing(&html, ListingLayout::Recent);
        info!("最近更新第 {} 页: {} 条", page, listing.items.len());
        Ok(RecentPage {
            page,
            recent: listing.items,
            has_next_page: listing.has_next_page,
        })
    }

    /// 漫画详情
    pub async fn manga(&self, id: &str) -> Result<MangaDetail> {
        let id = path_segment(id)?;
        let html = self
            .client
            .get_text(&FetchRequest::html(format!("/manga/{}", id)))
            .await?;
        let detail = self.extractor.parse_detail(&html, id)?;
        info!("详情 {}: {}", id, detail.title);
        Ok(detail)
    }

    /// 章节列表 (AJAX)
    ///
    /// 载荷形状不符时降级为空列表；阻断与传输错误照常上抛。
    pub async fn chapters(&self, id: &str, language: Option<&str>) -> Result<ChapterList> {
        let id = path_segment(id)?;
        let language = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => path_segment(lang)?,
            None => DEFAULT_LANGUAGE,
        };

        let req = FetchRequest::json(format!(
            "/ajax/read/{}/chapter/{}",
            manga_code(id),
            language
        ))
        .with_referer(to_absolute_url(&self.base, &format!("/manga/{}", id)));

        let chapters = match self
            .client
            .get_json::<Value>(&req)
            .await
            .and_then(|payload| ajax_html(&payload))
        {
            Ok(fragment) => self.extractor.parse_chapters(&fragment),
            Err(ScrapeError::Malformed(msg)) => {
                warn!("章节列表载荷异常 {}: {}", id, msg);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        info!("章节列表 {} [{}]: {} 章", id, language, chapters.len());
        Ok(ChapterList {
            manga_id: id.to_string(),
            language: language.to_string(),
            chapters,
        })
    }

    /// 章节图片 (AJAX)，`chapter_id` 为站内数字编号
    pub async fn chapter_images(&self, chapter_id: &str) -> Result<ChapterImages> {
        let chapter_id = path_segment(chapter_id)?;
        let payload: Value = self
            .client
            .get_json(&FetchRequest::json(format!(
                "/ajax/read/chapter/{}",
                chapter_id
            )))
            .await?;

        let pages = PageImage::numbered(resolve_all(&self.base, ajax_images(&payload)?));
        debug!("章节 {} 图片: {} 张", chapter_id, pages.len());
        Ok(ChapterImages {
            chapter_id: chapter_id.to_string(),
            total_pages: pages.len(),
            pages,
        })
    }

    /// 阅读页
    pub async fn read(&self, manga_id: &str, chapter_id: &str) -> Result<ReadChapter> {
        let manga_id = path_segment(manga_id)?;
        let chapter_id = path_segment(chapter_id)?;

        let req = FetchRequest::html(format!("/read/{}/{}", manga_id, chapter_id));
        let resp = self.client.get(&req).await?;
        let reader = self.extractor.parse_reader(&resp.body);

        if reader.images.is_empty() {
            warn!("阅读页 {}/{} 未找到图片", manga_id, chapter_id);
        }

        let pages = PageImage::numbered(reader.images);
        Ok(ReadChapter {
            manga_id: manga_id.to_string(),
            chapter_id: chapter_id.to_string(),
            title: reader.title,
            url: req.resolve(&self.base)?.to_string(),
            total_pages: pages.len(),
            pages,
        })
    }

    /// 按类型 / 题材 / 状态筛选
    pub async fn filter(&self, filters: Filters, page: u32) -> Result<FilterPage> {
        let filters = Filters {
            kind: non_blank(filters.kind),
            genre: non_blank(filters.genre),
            status: non_blank(filters.status),
        };
        let page = page.max(1);

        let req = FetchRequest::html("/filter").with_query(&FilterQuery {
            kind: filters.kind.as_deref(),
            genre: filters.genre.as_deref(),
            status: filters.status.as_deref(),
            page,
        });
        let html = self.client.get_text(&req).await?;
        let listing = self.extractor.parse_listing(&html, ListingLayout::Filter);

        info!("筛选 {:?} 第 {} 页: {} 条", filters, page, listing.items.len());
        Ok(FilterPage {
            filters,
            page,
            results: listing.items,
            has_next_page: listing.has_next_page,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
