//! 响应规整 (Response Normalizer)
//!
//! 标识推导、AJAX 载荷拆包、图片列表拍平。

use serde_json::Value;
use url::Url;

use crate::core::error::{Result, ScrapeError};
use crate::utils::to_absolute_url;

/// 取链接路径的最后一段作为外部可见 id
pub fn derive_id(link: &str) -> Option<String> {
    let path = link.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .next_back()
        .map(str::to_string)
}

/// 漫画 id 中最后一个 `.` 之后的站内编码，用于 AJAX 端点
///
/// `one-piecee.dkw` -> `dkw`；不含 `.` 时原样返回。
pub fn manga_code(id: &str) -> &str {
    id.rsplit('.').next().filter(|c| !c.is_empty()).unwrap_or(id)
}

/// 校验单个路径片段，拒绝可以改写上游路径的输入
pub fn path_segment(raw: &str) -> Result<&str> {
    let seg = raw.trim();
    if seg.is_empty() || seg == "." || seg == ".." || seg.contains(['/', '\\', '?', '#']) {
        return Err(ScrapeError::InvalidRequest(format!(
            "invalid path segment: {:?}",
            raw
        )));
    }
    Ok(seg)
}

/// 拍平图片载荷
///
/// 支持两种形状：`["url", ...]` 与 `[["url", w, h], ...]`，保持原顺序。
/// 两种形状都不符合的元素被跳过；非数组载荷视为格式错误。
pub fn flatten_images(value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| ScrapeError::Malformed("image payload is not an array".into()))?;

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(url.as_str()),
            Value::Array(tuple) => tuple.first().and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect())
}

/// 将图片地址统一解析为绝对 URL
pub fn resolve_all(base: &Url, urls: Vec<String>) -> Vec<String> {
    urls.iter().map(|u| to_absolute_url(base, u)).collect()
}

/// 拆出章节列表 AJAX 载荷中的 HTML 片段
///
/// 兼容 `{"result": "<html>"}` 与 `{"result": {"html": "<html>"}}`。
pub fn ajax_html(payload: &Value) -> Result<String> {
    let result = payload
        .get("result")
        .ok_or_else(|| ScrapeError::Malformed("missing `result` in chapter payload".into()))?;

    result
        .as_str()
        .or_else(|| result.get("html").and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::Malformed("chapter payload carries no HTML".into()))
}

/// 拆出章节图片 AJAX 载荷 `{"result": {"images": [...]}}`
pub fn ajax_images(payload: &Value) -> Result<Vec<String>> {
    let images = payload
        .get("result")
        .and_then(|r| r.get("images"))
        .ok_or_else(|| ScrapeError::Malformed("missing `result.images` in chapter payload".into()))?;
    flatten_images(images)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn id_is_last_path_segment() {
        assert_eq!(derive_id("/manga/one-piecee.dkw").as_deref(), Some("one-piecee.dkw"));
        assert_eq!(derive_id("/manga/naruto.x1/").as_deref(), Some("naruto.x1"));
        assert_eq!(
            derive_id("https://mangafire.to/read/bleach.k2/en/chapter-3?x=1#top").as_deref(),
            Some("chapter-3")
        );
        assert_eq!(derive_id("/"), None);
        assert_eq!(derive_id(""), None);
    }

    #[test]
    fn code_is_last_dot_segment() {
        assert_eq!(manga_code("one-piecee.dkw"), "dkw");
        assert_eq!(manga_code("plain"), "plain");
        assert_eq!(manga_code("trailing."), "trailing.");
    }

    #[test]
    fn path_segment_rejects_traversal() {
        assert_eq!(path_segment(" one-piecee.dkw ").unwrap(), "one-piecee.dkw");
        assert!(path_segment("..").is_err());
        assert!(path_segment("a/b").is_err());
        assert!(path_segment("").is_err());
        assert!(path_segment("x?y").is_err());
    }

    #[test]
    fn tuple_images_flatten_to_urls_in_order() {
        let payload = json!([
            ["https://s.mfcdn.nl/p/1.jpg", 800, 1200],
            ["https://s.mfcdn.nl/p/2.jpg", 800, 1199],
            ["https://s.mfcdn.nl/p/3.jpg", 0, 0]
        ]);
        assert_eq!(
            flatten_images(&payload).unwrap(),
            vec![
                "https://s.mfcdn.nl/p/1.jpg",
                "https://s.mfcdn.nl/p/2.jpg",
                "https://s.mfcdn.nl/p/3.jpg"
            ]
        );
    }

    #[test]
    fn flat_images_are_unchanged() {
        let urls = vec!["https://a/1.jpg", "/2.jpg", "https://a/3.jpg"];
        assert_eq!(flatten_images(&json!(urls)).unwrap(), urls);
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let payload = json!(["https://a/1.jpg", 42, {"url": "x"}, [], [7, 1, 1], "  "]);
        assert_eq!(flatten_images(&payload).unwrap(), vec!["https://a/1.jpg"]);
    }

    #[test]
    fn non_array_payload_is_malformed() {
        assert!(matches!(
            flatten_images(&json!({"images": []})),
            Err(ScrapeError::Malformed(_))
        ));
    }

    #[test]
    fn relative_images_resolve_against_base() {
        let base = Url::parse("https://mangafire.to").unwrap();
        assert_eq!(
            resolve_all(&base, vec!["/images/x.jpg".into(), "https://cdn/y.jpg".into()]),
            vec!["https://mangafire.to/images/x.jpg", "https://cdn/y.jpg"]
        );
    }

    #[test]
    fn ajax_html_accepts_both_shapes() {
        assert_eq!(ajax_html(&json!({"result": "<li></li>"})).unwrap(), "<li></li>");
        assert_eq!(
            ajax_html(&json!({"status": 200, "result": {"html": "<ul></ul>"}})).unwrap(),
            "<ul></ul>"
        );
        assert!(ajax_html(&json!({"status": 500})).is_err());
        assert!(ajax_html(&json!({"result": {"count": 3}})).is_err());
    }

    #[test]
    fn ajax_images_unwraps_result() {
        let payload = json!({"status": 200, "result": {"images": [["https://a/1.jpg", 1, 1]]}});
        assert_eq!(ajax_images(&payload).unwrap(), vec!["https://a/1.jpg"]);
        assert!(ajax_images(&json!({"result": {}})).is_err());
    }
}
