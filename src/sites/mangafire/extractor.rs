//! MangaFire 解析器 (Extractor)
//!
//! 负责列表页、详情页、章节列表以及阅读页的 DOM 解析。

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::core::error::{Result, ScrapeError};
use crate::core::model::{ChapterSummary, Listing, MangaDetail, ReaderPage, SearchResult};
use crate::utils::{collapse_whitespace, to_absolute_url};

use super::SiteSelectors;
use super::normalizer::{derive_id, flatten_images};

/// 列表页布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingLayout {
    /// 搜索与筛选结果 (`/filter`)
    Filter,
    /// 首页热门 (`/home`)
    Trending,
    /// 最近更新 (`/recent`)
    Recent,
}

fn script_images_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"images\s*=\s*\[").unwrap())
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").unwrap())
}

/// 选中元素的规整文本，空串视为缺失
fn text_of(parent: &ElementRef, selector: &Selector) -> Option<String> {
    parent
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// 读取非空属性，按顺序尝试
fn attr_of<'a>(el: &ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| el.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// 从 `images = [...]` 赋值中截取括号配平的数组字面量
fn cut_array_literal(src: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in src.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&src[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 内联脚本回退：解析 `images = [...]`，任何异常都返回 None
pub fn extract_script_images(script: &str) -> Option<Vec<String>> {
    let m = script_images_re().find(script)?;
    let literal = cut_array_literal(&script[m.end() - 1..])?;
    let value: serde_json::Value = serde_json::from_str(literal)
        .map_err(|e| debug!("内联图片数组解析失败: {}", e))
        .ok()?;
    flatten_images(&value).ok()
}

/// 站点解析器
pub struct MangaFireExtractor {
    base: Url,
}

impl MangaFireExtractor {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// 规范化 URL
    #[inline]
    fn normalize(&self, path: &str) -> String {
        to_absolute_url(&self.base, path)
    }

    fn image_of(&self, parent: &ElementRef, selector: &Selector) -> Option<String> {
        parent
            .select(selector)
            .find_map(|img| attr_of(&img, &["data-src", "src"]))
            .map(|src| self.normalize(src))
    }

    /// 解析列表页
    pub fn parse_listing(&self, html: &str, layout: ListingLayout) -> Listing {
        let doc = Html::parse_document(html);
        let s = SiteSelectors::get();

        let units: Vec<ElementRef> = match layout {
            ListingLayout::Filter => doc.select(&s.unit).collect(),
            ListingLayout::Trending => doc.select(&s.trending_unit).collect(),
            ListingLayout::Recent => {
                let original: Vec<_> = doc.select(&s.recent_unit).collect();
                if original.is_empty() {
                    doc.select(&s.unit).collect()
                } else {
                    original
                }
            }
        };

        let items = units
            .iter()
            .filter_map(|unit| self.parse_unit(unit, layout))
            .collect::<Vec<_>>();

        debug!("{:?} 布局: {} 个容器, {} 条有效", layout, units.len(), items.len());

        Listing {
            items,
            has_next_page: doc.select(&s.pagination_next).next().is_some(),
        }
    }

    /// 解析单个列表容器，缺少标题或链接时跳过
    fn parse_unit(&self, unit: &ElementRef, layout: ListingLayout) -> Option<SearchResult> {
        let s = SiteSelectors::get();

        let link = match layout {
            ListingLayout::Recent => unit
                .select(&s.poster_link)
                .next()
                .or_else(|| unit.select(&s.first_link).next()),
            _ => unit.select(&s.first_link).next(),
        }?;
        let href = attr_of(&link, &["href"])?;
        let id = derive_id(href)?;

        let title =
            text_of(unit, &s.unit_name).or_else(|| text_of(unit, &s.unit_name_fallback))?;

        Some(SearchResult {
            id,
            title,
            image_url: self.image_of(unit, &s.image),
            kind: text_of(unit, &s.unit_type),
            status: text_of(unit, &s.unit_status),
            detail_url: self.normalize(href),
            latest_chapter: match layout {
                ListingLayout::Recent => text_of(unit, &s.unit_chapter),
                _ => None,
            },
        })
    }

    /// 解析详情页
    pub fn parse_detail(&self, html: &str, id: &str) -> Result<MangaDetail> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let s = SiteSelectors::get();

        let title = text_of(&root, &s.detail_title).ok_or_else(|| {
            ScrapeError::Malformed(format!("manga title not found for {}", id))
        })?;

        let mut genres: Vec<String> = doc
            .select(&s.detail_genres)
            .map(|a| element_text(&a))
            .filter(|g| !g.is_empty())
            .collect();
        if genres.is_empty() {
            genres = label_value(&doc, "Genres")
                .map(|value| {
                    value
                        .select(&s.anchor)
                        .map(|a| element_text(&a))
                        .filter(|g| !g.is_empty())
                        .collect()
                })
                .unwrap_or_default();
        }

        let status = Some(lookup_label(&doc, "Status"))
            .filter(|v| !v.is_empty())
            .or_else(|| text_of(&root, &s.detail_status))
            .unwrap_or_default();

        let kind = Some(lookup_label(&doc, "Type"))
            .filter(|v| !v.is_empty())
            .or_else(|| text_of(&root, &s.detail_type))
            .unwrap_or_default();

        let alternative_titles = doc
            .select(&s.detail_alt_titles)
            .flat_map(|el| {
                element_text(&el)
                    .split(';')
                    .map(|t| t.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|t| !t.is_empty())
            .collect();

        Ok(MangaDetail {
            id: id.to_string(),
            title,
            url: self.normalize(&format!("/manga/{}", id)),
            image_url: self.image_of(&root, &s.detail_poster),
            description: doc
                .select(&s.detail_summary)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            genres,
            author: lookup_label(&doc, "Author"),
            status,
            kind,
            alternative_titles,
        })
    }

    /// 解析章节列表片段，缺少链接或 `data-id` 的条目被跳过
    pub fn parse_chapters(&self, html: &str) -> Vec<ChapterSummary> {
        let doc = Html::parse_fragment(html);
        let s = SiteSelectors::get();

        doc.select(&s.chapter_item)
            .filter_map(|item| {
                let link = item.select(&s.first_link).next()?;
                let href = attr_of(&link, &["href"])?;
                let id = attr_of(&link, &["data-id"]).or_else(|| attr_of(&item, &["data-id"]))?;

                let name = text_of(&item, &s.chapter_name).unwrap_or_else(|| element_text(&link));
                let number = attr_of(&link, &["data-number"])
                    .or_else(|| attr_of(&item, &["data-number"]))
                    .map(str::to_string)
                    .or_else(|| number_re().find(&name).map(|m| m.as_str().to_string()))
                    .unwrap_or_default();
                let title = attr_of(&link, &["title"])
                    .map(str::to_string)
                    .unwrap_or(name);

                Some(ChapterSummary {
                    id: id.to_string(),
                    number,
                    title,
                    url: self.normalize(href),
                    date: text_of(&item, &s.chapter_date),
                })
            })
            .collect()
    }

    /// 解析阅读页：优先 `<img>`，其次内联脚本中的 `images = [...]`
    pub fn parse_reader(&self, html: &str) -> ReaderPage {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let s = SiteSelectors::get();

        let mut images: Vec<String> = doc
            .select(&s.reader_img)
            .filter_map(|img| attr_of(&img, &["data-src", "src"]))
            .map(|src| self.normalize(src))
            .collect();

        if images.is_empty() {
            images = doc
                .select(&s.script)
                .map(|script| script.text().collect::<String>())
                .filter(|text| text.contains("images"))
                .find_map(|text| extract_script_images(&text))
                .map(|urls| urls.iter().map(|u| self.normalize(u)).collect())
                .unwrap_or_default();
            debug!("阅读页回退到内联脚本: {} 张图片", images.len());
        }

        ReaderPage {
            title: text_of(&root, &s.chapter_heading).unwrap_or_default(),
            images,
        }
    }
}

/// 按标签文本定位相邻的值元素 (如 `<span>Author:</span><span>...</span>`)
fn label_value<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let wanted = label.trim().trim_end_matches(':').to_lowercase();
    let s = SiteSelectors::get();

    doc.select(&s.meta_label)
        .find(|span| {
            element_text(span)
                .trim_end_matches(':')
                .trim()
                .eq_ignore_ascii_case(&wanted)
        })
        .and_then(|span| span.next_siblings().find_map(ElementRef::wrap))
}

/// 标签查找，缺失时返回空串
pub fn lookup_label(doc: &Html, label: &str) -> String {
    label_value(doc, label)
        .map(|value| element_text(&value))
        .unwrap_or_default()
}
