//! MangaFire 选择器
//!
//! 预编译的 CSS 选择器

use std::sync::OnceLock;

use scraper::Selector;

/// 站点选择器集合
pub struct SiteSelectors {
    // 列表页
    pub unit: Selector,
    pub trending_unit: Selector,
    pub recent_unit: Selector,
    pub first_link: Selector,
    pub poster_link: Selector,
    pub unit_name: Selector,
    pub unit_name_fallback: Selector,
    pub image: Selector,
    pub unit_type: Selector,
    pub unit_status: Selector,
    pub unit_chapter: Selector,
    pub pagination_next: Selector,

    // 详情页
    pub detail_title: Selector,
    pub detail_poster: Selector,
    pub detail_summary: Selector,
    pub detail_genres: Selector,
    pub detail_status: Selector,
    pub detail_type: Selector,
    pub detail_alt_titles: Selector,
    pub meta_label: Selector,
    pub anchor: Selector,

    // 章节列表
    pub chapter_item: Selector,
    pub chapter_name: Selector,
    pub chapter_date: Selector,

    // 阅读页
    pub reader_img: Selector,
    pub script: Selector,
    pub chapter_heading: Selector,
}

static SELECTORS: OnceLock<SiteSelectors> = OnceLock::new();

impl SiteSelectors {
    /// 获取全局选择器实例
    pub fn get() -> &'static SiteSelectors {
        SELECTORS.get_or_init(|| SiteSelectors {
            unit: Selector::parse(".unit").unwrap(),
            trending_unit: Selector::parse(".trending .swiper-slide, .rank .unit").unwrap(),
            recent_unit: Selector::parse(".original .unit").unwrap(),
            first_link: Selector::parse("a[href]").unwrap(),
            poster_link: Selector::parse("a.poster[href]").unwrap(),
            unit_name: Selector::parse(".info .name").unwrap(),
            unit_name_fallback: Selector::parse(".name").unwrap(),
            image: Selector::parse("img").unwrap(),
            unit_type: Selector::parse(".type").unwrap(),
            unit_status: Selector::parse(".status").unwrap(),
            unit_chapter: Selector::parse(".chapter").unwrap(),
            pagination_next: Selector::parse(
                ".pagination .next:not(.disabled), .pagination a[rel='next']",
            )
            .unwrap(),

            detail_title: Selector::parse(".info h1").unwrap(),
            detail_poster: Selector::parse(".poster img").unwrap(),
            detail_summary: Selector::parse(".summary .content, #synopsis .modal-content").unwrap(),
            detail_genres: Selector::parse(".genres a").unwrap(),
            detail_status: Selector::parse(".info > p").unwrap(),
            detail_type: Selector::parse(".info .min-info a").unwrap(),
            detail_alt_titles: Selector::parse(".info h6, .alternative").unwrap(),
            meta_label: Selector::parse(".meta span").unwrap(),
            anchor: Selector::parse("a").unwrap(),

            chapter_item: Selector::parse(".item").unwrap(),
            chapter_name: Selector::parse(".name").unwrap(),
            chapter_date: Selector::parse(".date, .time").unwrap(),

            reader_img: Selector::parse(".page-img img, .reader-img img, #images img").unwrap(),
            script: Selector::parse("script").unwrap(),
            chapter_heading: Selector::parse(".chapter-name, .heading").unwrap(),
        })
    }
}
