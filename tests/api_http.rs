// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// Upstreams are replaced by counting stubs; the router is exercised via
// tower::ServiceExt::oneshot.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use sky_news_aggregator::api::{self, AppState};
use sky_news_aggregator::config::{AppConfig, Upstream};
use sky_news_aggregator::params::{yesterday_window, ArticleQuery, PopularityQuery};
use sky_news_aggregator::upstream::{
    ArticleSearch, ChartbeatPayload, NewsApiPayload, PopularitySource, RawArticle, RawPage,
    RawStats, UpstreamFailure,
};

const BODY_LIMIT: usize = 1024 * 1024;

/* ----------------------------
Stubs
---------------------------- */

#[derive(Default)]
struct StubArticles {
    calls: AtomicUsize,
    fail: AtomicBool,
    last: Mutex<Option<ArticleQuery>>,
    articles: Vec<RawArticle>,
    total: u64,
}

#[async_trait]
impl ArticleSearch for StubArticles {
    async fn search(&self, query: &ArticleQuery) -> Result<NewsApiPayload, UpstreamFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(query.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamFailure::Transport {
                upstream: Upstream::NewsApi,
                detail: "connection refused".into(),
            });
        }
        Ok(NewsApiPayload {
            status: Some("ok".into()),
            total_results: Some(self.total),
            articles: self.articles.clone(),
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct StubPopularity {
    calls: AtomicUsize,
    fail: AtomicBool,
    last: Mutex<Option<PopularityQuery>>,
    pages: Vec<RawPage>,
}

#[async_trait]
impl PopularitySource for StubPopularity {
    async fn top_pages(&self, query: &PopularityQuery) -> Result<ChartbeatPayload, UpstreamFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(query.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamFailure::Status {
                upstream: Upstream::Chartbeat,
                status: 503,
                detail: "Service Unavailable".into(),
            });
        }
        Ok(ChartbeatPayload {
            pages: self.pages.clone(),
        })
    }
}

fn configured() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.newsapi.api_key = "test-news-key".into();
    cfg.chartbeat.api_key = "test-cb-key".into();
    cfg.chartbeat.api_url = "https://api.chartbeat.example/live/toppages/v3/".into();
    cfg
}

fn page(path: &str, title: &str, people: u64) -> RawPage {
    RawPage {
        path: Some(path.into()),
        title: Some(title.into()),
        stats: Some(RawStats {
            people: Some(people),
        }),
    }
}

fn article(title: &str, url: &str) -> RawArticle {
    RawArticle {
        title: Some(title.into()),
        url: Some(url.into()),
        ..Default::default()
    }
}

fn app(cfg: AppConfig, articles: Arc<StubArticles>, popularity: Arc<StubPopularity>) -> Router {
    api::router(AppState::with_sources(cfg, articles, popularity))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("parse json body");
    (status, v)
}

fn assert_error_envelope(v: &Json) {
    assert!(v.get("error").and_then(Json::as_str).is_some(), "missing 'error': {v}");
    assert!(v.get("details").and_then(Json::as_str).is_some(), "missing 'details': {v}");
    assert!(v.get("status").is_none(), "error envelope must not carry 'status': {v}");
}

/* ----------------------------
Static routes
---------------------------- */

#[tokio::test]
async fn home_lists_endpoints() {
    let app = app(configured(), Default::default(), Default::default());
    let (status, v) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["message"], "Sky News Summariser API");
    let endpoints = v["endpoints"].as_object().expect("endpoints object");
    assert!(endpoints.contains_key("/api/news/sky"));
    assert!(endpoints.contains_key("/api/news/sky/yesterday"));
    assert!(endpoints.contains_key("/api/news/chartbeat/top"));
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app(configured(), Default::default(), Default::default());
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

/* ----------------------------
/api/news/sky
---------------------------- */

#[tokio::test]
async fn sky_news_returns_articles_and_echoes_paging() {
    let articles = Arc::new(StubArticles {
        articles: vec![
            article("Test Article", "https://news.sky.com/story/test"),
            article("Another", "https://news.sky.com/story/another"),
        ],
        total: 120,
        ..Default::default()
    });
    let app = app(configured(), articles.clone(), Default::default());

    let (status, v) = get_json(&app, "/api/news/sky?page_size=50&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");
    assert_eq!(v["totalResults"], 120);
    assert_eq!(v["page"], 2);
    assert_eq!(v["pageSize"], 50);
    let arr = v["articles"].as_array().expect("articles array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["title"], "Test Article");

    let q = articles.last.lock().unwrap().clone().expect("query recorded");
    assert_eq!(q.search_term, "news");
    assert_eq!(q.domain_filter, "sky.com");
    assert_eq!(q.page_size, 50);
    assert_eq!(q.page, 2);
}

#[tokio::test]
async fn sky_news_caps_page_size_and_passes_dates() {
    let articles = Arc::new(StubArticles::default());
    let app = app(configured(), articles.clone(), Default::default());

    let (status, v) = get_json(
        &app,
        "/api/news/sky?q=election&page_size=500&from_date=2024-01-01&to_date=2024-01-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["pageSize"], 100);

    let q = articles.last.lock().unwrap().clone().unwrap();
    assert_eq!(q.search_term, "election");
    assert_eq!(q.page_size, 100);
    assert_eq!(q.date_from.as_deref(), Some("2024-01-01"));
    assert_eq!(q.date_to.as_deref(), Some("2024-01-31"));
}

#[tokio::test]
async fn sky_news_treats_garbage_numbers_as_absent() {
    let articles = Arc::new(StubArticles::default());
    let app = app(configured(), articles.clone(), Default::default());

    let (status, v) = get_json(&app, "/api/news/sky?page_size=lots&page=-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["pageSize"], 10);
    assert_eq!(v["page"], 1);
}

#[tokio::test]
async fn repeated_query_keys_take_the_first_value() {
    let articles = Arc::new(StubArticles::default());
    let popularity = Arc::new(StubPopularity::default());
    let app = app(configured(), articles.clone(), popularity.clone());

    let (status, v) = get_json(&app, "/api/news/sky?q=a&q=b&page_size=5&page_size=500").await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["pageSize"], 5);
    let q = articles.last.lock().unwrap().clone().unwrap();
    assert_eq!(q.search_term, "a");

    let (status, v) = get_json(&app, "/api/news/sky/yesterday?q=x&q=y").await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(articles.last.lock().unwrap().clone().unwrap().search_term, "x");

    let (status, v) = get_json(&app, "/api/news/chartbeat/top?limit=2&limit=40").await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["limit"], 2);
    assert_eq!(popularity.last.lock().unwrap().clone().unwrap().fetch_count(), 6);
}

#[tokio::test]
async fn missing_news_key_short_circuits_without_calling_upstream() {
    let mut cfg = configured();
    cfg.newsapi.api_key.clear();
    let articles = Arc::new(StubArticles::default());
    let app = app(cfg, articles.clone(), Default::default());

    for uri in ["/api/news/sky", "/api/news/sky/yesterday"] {
        let (status, v) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_error_envelope(&v);
        assert!(v["details"].as_str().unwrap().contains("NEWS_API_KEY"));
    }
    assert_eq!(articles.calls.load(Ordering::SeqCst), 0, "no outbound call expected");
}

#[tokio::test]
async fn upstream_failure_is_500_and_service_recovers() {
    let articles = Arc::new(StubArticles {
        articles: vec![article("Back", "https://news.sky.com/story/back")],
        total: 1,
        ..Default::default()
    });
    articles.fail.store(true, Ordering::SeqCst);
    let app = app(configured(), articles.clone(), Default::default());

    let (status, v) = get_json(&app, "/api/news/sky").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_envelope(&v);
    assert_eq!(v["error"], "Failed to fetch news from NewsAPI");
    assert!(v["details"].as_str().unwrap().contains("connection refused"));

    articles.fail.store(false, Ordering::SeqCst);
    let (status, v) = get_json(&app, "/api/news/sky").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["articles"].as_array().unwrap().len(), 1);
    assert_eq!(articles.calls.load(Ordering::SeqCst), 2, "exactly one call per request");
}

/* ----------------------------
/api/news/sky/yesterday
---------------------------- */

#[tokio::test]
async fn yesterday_window_is_server_side_and_not_overridable() {
    let articles = Arc::new(StubArticles::default());
    let app = app(configured(), articles.clone(), Default::default());

    let expected = yesterday_window();
    let (status, v) = get_json(
        &app,
        "/api/news/sky/yesterday?from_date=1999-01-01&to_date=1999-01-02&page_size=250&page=7",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");
    assert_eq!(v["pageSize"], 100);
    assert!(v.get("page").is_none(), "yesterday envelope has no page: {v}");

    let q = articles.last.lock().unwrap().clone().unwrap();
    // Midnight between the two clock reads would shift both dates by one day.
    let now = yesterday_window();
    let from = q.date_from.expect("from set");
    let to = q.date_to.expect("to set");
    assert!(from == expected.start_ymd() || from == now.start_ymd(), "from={from}");
    assert!(to == expected.end_ymd() || to == now.end_ymd(), "to={to}");
    assert_eq!(v["date"], from.as_str());
    assert_eq!(q.page, 1);
}

/* ----------------------------
/api/news/chartbeat/top
---------------------------- */

#[tokio::test]
async fn chartbeat_filters_non_story_pages() {
    let popularity = Arc::new(StubPopularity {
        pages: vec![
            page("/story/a", "Story A", 1500),
            page("/home", "Home Page", 5000),
            page("story/b", "Story B", 1200),
        ],
        ..Default::default()
    });
    let app = app(configured(), Default::default(), popularity.clone());

    let (status, v) = get_json(&app, "/api/news/chartbeat/top?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");
    assert_eq!(v["total_stories"], 2);
    assert_eq!(v["limit"], 10);
    assert!(v["sort_by"].is_null());

    let stories = v["stories"].as_array().unwrap();
    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0]["url"], "https://news.sky.com/story/a");
    assert_eq!(stories[0]["concurrent_visitors"], 1500);
    assert_eq!(stories[1]["url"], "https://news.sky.com/story/b");
    assert!(stories.iter().all(|s| s["url"].as_str().unwrap().contains("/story/")));
}

#[tokio::test]
async fn chartbeat_clamps_limit_and_over_fetches() {
    let popularity = Arc::new(StubPopularity {
        pages: (0..150)
            .map(|i| page(&format!("/story/{i}"), "S", i))
            .collect(),
        ..Default::default()
    });
    let app = app(configured(), Default::default(), popularity.clone());

    let (status, v) = get_json(&app, "/api/news/chartbeat/top?limit=80&sort_by=returning").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["limit"], 50);
    assert_eq!(v["sort_by"], "returning");
    assert_eq!(v["stories"].as_array().unwrap().len(), 50);

    let q = popularity.last.lock().unwrap().clone().unwrap();
    assert_eq!(q.limit, 50);
    assert_eq!(q.fetch_count(), 150);
    assert_eq!(q.sort_by.as_deref(), Some("returning"));
    assert!(q.all_platforms);

    let (_, v) = get_json(&app, "/api/news/chartbeat/top?limit=0").await;
    assert_eq!(v["limit"], 1);
    assert_eq!(v["stories"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn chartbeat_unconfigured_makes_zero_calls() {
    let mut cfg = configured();
    cfg.chartbeat.api_url.clear();
    let popularity = Arc::new(StubPopularity::default());
    let app = app(cfg, Default::default(), popularity.clone());

    let (status, v) = get_json(&app, "/api/news/chartbeat/top").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_envelope(&v);
    assert_eq!(v["error"], "Chartbeat is not configured");
    assert!(v["details"].as_str().unwrap().contains("CHARTBEAT_API_URL"));
    assert_eq!(popularity.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chartbeat_upstream_error_maps_to_envelope() {
    let popularity = Arc::new(StubPopularity::default());
    popularity.fail.store(true, Ordering::SeqCst);
    let app = app(configured(), Default::default(), popularity.clone());

    let (status, v) = get_json(&app, "/api/news/chartbeat/top").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_envelope(&v);
    assert_eq!(v["error"], "Failed to fetch top stories from Chartbeat");
    assert!(v["details"].as_str().unwrap().contains("503"));
}
