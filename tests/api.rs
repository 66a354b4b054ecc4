use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use mangafire_api::core::error::{Result, ScrapeError};
use mangafire_api::interfaces::{FetchRequest, FetchResponse, Fetcher};
use mangafire_api::server::{AppState, router};
use mangafire_api::sites::mangafire::MangaFire;

const BASE: &str = "https://mangafire.to";

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e))
}

/// 按站内路径返回固定响应的抓取后端
#[derive(Default)]
struct StubFetcher {
    routes: HashMap<String, (StatusCode, String)>,
    fallback: Option<(StatusCode, String)>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn route(mut self, path: &str, status: StatusCode, body: impl Into<String>) -> Self {
        self.routes.insert(path.to_string(), (status, body.into()));
        self
    }

    /// 所有路径都返回同一响应
    fn always(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            fallback: Some((status, body.into())),
            ..Self::default()
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = req.resolve(&Url::parse(BASE)?)?;
        self.requested.lock().push(url.to_string());

        let (status, body) = self
            .routes
            .get(&req.path)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ScrapeError::Browser(format!("no stub for {}", req.path)))?;
        Ok(FetchResponse::new(url, status, body))
    }
}

fn app(stub: Arc<StubFetcher>) -> axum::Router {
    let site = MangaFire::new(Url::parse(BASE).unwrap(), stub);
    router(AppState::new(Arc::new(site)))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn search_returns_linked_units_in_order() {
    let stub = Arc::new(StubFetcher::new().route(
        "/filter",
        StatusCode::OK,
        fixture("search_naruto.html"),
    ));
    let (status, body) = get(app(stub.clone()), "/api/search?q=naruto").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "naruto");
    assert_eq!(body["page"], 1);
    assert_eq!(body["hasNextPage"], true);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "naruto.x1");
    assert_eq!(results[0]["title"], "Naruto");
    assert_eq!(results[0]["type"], "Manga");
    assert_eq!(results[0]["detailUrl"], "https://mangafire.to/manga/naruto.x1");
    assert_eq!(results[1]["id"], "boruto-naruto-next-generations.ry2");
    assert_eq!(results[1]["status"], "Releasing");
    assert_eq!(
        results[1]["imageUrl"],
        "https://mangafire.to/covers/boruto.jpg"
    );

    assert_eq!(
        stub.requested(),
        vec!["https://mangafire.to/filter?keyword=naruto&page=1"]
    );
}

#[tokio::test]
async fn missing_query_is_bad_request_without_fetching() {
    let stub = Arc::new(StubFetcher::always(StatusCode::OK, "<html></html>"));

    for uri in ["/api/search", "/api/search?q=", "/api/search?q=%20%20"] {
        let (status, body) = get(app(stub.clone()), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["kind"], "bad_request");
        assert_eq!(body["error"], "Query parameter \"q\" is required");
    }
    assert!(stub.requested().is_empty());
}

#[tokio::test]
async fn empty_listing_yields_empty_array() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        fixture("empty_listing.html"),
    ));

    let (status, body) = get(app(stub.clone()), "/api/search?q=zzzz&page=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 4);
    assert_eq!(body["results"], Value::Array(vec![]));
    assert_eq!(body["hasNextPage"], false);

    let (_, body) = get(app(stub.clone()), "/api/recent?page=abc").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["recent"], Value::Array(vec![]));

    let (_, body) = get(app(stub), "/api/trending").await;
    assert_eq!(body["trending"], Value::Array(vec![]));
}

#[tokio::test]
async fn challenge_page_blocks_every_endpoint() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        fixture("challenge.html"),
    ));

    let uris = [
        "/api/search?q=naruto",
        "/api/trending",
        "/api/recent",
        "/api/manga/one-piecee.dkw",
        "/api/manga/one-piecee.dkw/chapters",
        "/api/manga/one-piecee.dkw/chapters/ja",
        "/api/chapter/3361582",
        "/api/read/one-piecee.dkw/chapter-1095",
        "/api/filter?type=manga",
    ];
    for uri in uris {
        let (status, body) = get(app(stub.clone()), uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["kind"], "blocked", "{}", uri);
    }
    assert_eq!(stub.requested().len(), uris.len());
}

#[tokio::test]
async fn cloudflare_detection_script_does_not_block_regular_pages() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        fixture("filter_with_jsd.html"),
    ));
    let (status, body) = get(app(stub), "/api/search?q=naruto").await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "naruto.x1");
}

#[tokio::test]
async fn forbidden_status_is_blocked() {
    let stub = Arc::new(StubFetcher::always(StatusCode::FORBIDDEN, "<html></html>"));
    let (status, body) = get(app(stub), "/api/trending").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "blocked");
}

#[tokio::test]
async fn manga_detail_is_parsed() {
    let stub = Arc::new(StubFetcher::new().route(
        "/manga/one-piecee.dkw",
        StatusCode::OK,
        fixture("manga_detail.html"),
    ));
    let (status, body) = get(app(stub), "/api/manga/one-piecee.dkw").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "one-piecee.dkw");
    assert_eq!(body["title"], "One Piece");
    assert_eq!(body["url"], "https://mangafire.to/manga/one-piecee.dkw");
    assert_eq!(body["imageUrl"], "https://static.mfcdn.nl/h/op.jpg");
    assert_eq!(body["author"], "Oda Eiichiro");
    assert_eq!(body["status"], "Releasing");
    assert_eq!(body["type"], "Manga");
    assert_eq!(
        body["genres"],
        serde_json::json!(["Action", "Adventure", "Fantasy"])
    );
    assert!(
        body["description"]
            .as_str()
            .unwrap()
            .starts_with("Gol D. Roger")
    );
    assert_eq!(body["alternativeTitles"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn upstream_not_found_surfaces_as_404() {
    let stub = Arc::new(StubFetcher::always(StatusCode::NOT_FOUND, "<html></html>"));
    let (status, body) = get(app(stub), "/api/manga/missing.zz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn upstream_server_error_is_bad_gateway() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::INTERNAL_SERVER_ERROR,
        "<html></html>",
    ));
    let (status, body) = get(app(stub), "/api/read/x.1/chapter-1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "transport_failure");
}

#[tokio::test]
async fn chapters_use_manga_code_and_skip_items_without_id() {
    let stub = Arc::new(StubFetcher::new().route(
        "/ajax/read/dkw/chapter/en",
        StatusCode::OK,
        fixture("chapters.json"),
    ));
    let (status, body) = get(app(stub), "/api/manga/one-piecee.dkw/chapters").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mangaId"], "one-piecee.dkw");
    assert_eq!(body["language"], "en");

    let chapters = body["chapters"].as_array().unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0]["id"], "3361582");
    assert_eq!(chapters[0]["number"], "1095");
    assert_eq!(chapters[0]["title"], "Chap 1095: A World That Gets You");
    assert_eq!(
        chapters[0]["url"],
        "https://mangafire.to/read/one-piecee.dkw/en/chapter-1095"
    );
}

#[tokio::test]
async fn chapters_accept_language_segment() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        r#"{"status":200,"result":{"html":""}}"#,
    ));
    let (status, body) = get(app(stub.clone()), "/api/manga/one-piecee.dkw/chapters/ja").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "ja");
    assert_eq!(
        stub.requested(),
        vec!["https://mangafire.to/ajax/read/dkw/chapter/ja"]
    );
}

#[tokio::test]
async fn malformed_chapter_payload_degrades_to_empty() {
    for payload in [r#"{"status":200}"#, "not json at all", r#"{"result":{"count":3}}"#] {
        let stub = Arc::new(StubFetcher::always(StatusCode::OK, payload));
        let (status, body) = get(app(stub), "/api/manga/one-piecee.dkw/chapters").await;
        assert_eq!(status, StatusCode::OK, "{}", payload);
        assert_eq!(body["chapters"], Value::Array(vec![]));
    }
}

#[tokio::test]
async fn chapter_image_tuples_are_flattened() {
    let stub = Arc::new(StubFetcher::new().route(
        "/ajax/read/chapter/3361582",
        StatusCode::OK,
        fixture("chapter_images.json"),
    ));
    let (status, body) = get(app(stub), "/api/chapter/3361582").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chapterId"], "3361582");
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["pages"][0]["page"], 1);
    assert_eq!(body["pages"][0]["image"], "https://s1.mfcdn.nl/op/1095/001.jpg");
    assert_eq!(body["pages"][2]["page"], 3);
    assert_eq!(body["pages"][2]["image"], "https://s1.mfcdn.nl/op/1095/003.jpg");
}

#[tokio::test]
async fn chapter_images_without_result_is_malformed() {
    let stub = Arc::new(StubFetcher::always(StatusCode::OK, r#"{"status":200}"#));
    let (status, body) = get(app(stub), "/api/chapter/1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "malformed_payload");
}

#[tokio::test]
async fn read_falls_back_to_inline_script() {
    let stub = Arc::new(StubFetcher::new().route(
        "/read/one-piecee.dkw/chapter-1095",
        StatusCode::OK,
        fixture("read_script.html"),
    ));
    let (status, body) = get(app(stub), "/api/read/one-piecee.dkw/chapter-1095").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mangaId"], "one-piecee.dkw");
    assert_eq!(body["chapterId"], "chapter-1095");
    assert_eq!(body["title"], "Chapter 1095");
    assert_eq!(
        body["url"],
        "https://mangafire.to/read/one-piecee.dkw/chapter-1095"
    );
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["pages"][1]["image"], "https://s1.mfcdn.nl/op/1095/002.jpg");
    assert_eq!(
        body["pages"][2]["image"],
        "https://mangafire.to/static/op/1095/003.jpg"
    );
}

#[tokio::test]
async fn read_with_broken_script_returns_no_pages() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        "<html><script>var images = [\"a.jpg\", broken;</script></html>",
    ));
    let (status, body) = get(app(stub), "/api/read/x.1/chapter-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalPages"], 0);
    assert_eq!(body["pages"], Value::Array(vec![]));
}

#[tokio::test]
async fn filter_forwards_only_given_conditions() {
    let stub = Arc::new(StubFetcher::always(
        StatusCode::OK,
        fixture("search_naruto.html"),
    ));
    let (status, body) = get(app(stub.clone()), "/api/filter?type=manga&genre=action&status=&page=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["filters"], serde_json::json!({"type": "manga", "genre": "action"}));
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(
        stub.requested(),
        vec!["https://mangafire.to/filter?type=manga&genre=action&page=2"]
    );
}

#[tokio::test]
async fn info_and_health_need_no_upstream() {
    let stub = Arc::new(StubFetcher::new());

    let (status, body) = get(app(stub.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "stub");
    assert!(body["endpoints"]["search"].is_string());

    let resp = app(stub.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");

    assert!(stub.requested().is_empty());
}

#[tokio::test]
async fn traversal_in_path_params_is_rejected() {
    let stub = Arc::new(StubFetcher::always(StatusCode::OK, "<html></html>"));
    let (status, body) = get(app(stub.clone()), "/api/manga/..").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
    assert!(stub.requested().is_empty());
}
