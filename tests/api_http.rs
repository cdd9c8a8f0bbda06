// tests/api_http.rs
//
// HTTP-level tests for the admin API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - POST /api/scraper/run          (full run over mocks)
// - POST /api/scraper/schedule     (lifecycle + invalid action)
// - GET  /api/scraper/schedule
// - POST /api/scraper/test         (param validation + probe output)
// - GET/DELETE /api/scraper/runs   (listing, stats, pruning params)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use legal_news_harvester::classify::{Classifier, FixedClassifier};
use legal_news_harvester::config::SourceConfig;
use legal_news_harvester::scrape::extract::Extractor;
use legal_news_harvester::scrape::fetch::{FetchError, PageFetcher};
use legal_news_harvester::scrape::scheduler::{Interval, ScrapeScheduler};
use legal_news_harvester::scrape::ScrapeContext;
use legal_news_harvester::store::Store;
use legal_news_harvester::{api, AppState};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

const LISTING_URL: &str = "https://news.example.com/law";
const LISTING_HTML: &str =
    r#"<h2><a href="/law/case-1">Court rules on privacy law reform</a></h2>"#;

#[derive(Default)]
struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            })
    }
}

/// Build the same Router the binary uses, on top of mocks.
fn test_router() -> (Router, AppState) {
    let fetcher = StaticFetcher::default()
        .with_page(LISTING_URL, LISTING_HTML)
        .with_page(
            "https://news.example.com/law/case-1",
            "<p>The court handed down its decision today.</p>",
        );
    let ctx = Arc::new(ScrapeContext {
        sources: vec![SourceConfig {
            name: "Test Wire".to_string(),
            url: LISTING_URL.to_string(),
            base_url: "https://news.example.com".to_string(),
            selector: None,
            legal_path: None,
        }],
        fetcher: Arc::new(fetcher),
        classifier: Arc::new(FixedClassifier::default()) as Arc<dyn Classifier>,
        extractor: Extractor::default(),
        store: Store::open_in_memory().expect("in-memory store"),
    });
    let scheduler = Arc::new(ScrapeScheduler::new(Arc::clone(&ctx), Interval::Hourly));
    let state = AppState { ctx, scheduler };
    (api::router(state.clone()), state)
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (app, _) = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_run_executes_and_reports_summary() {
    let (app, state) = test_router();

    let resp = app
        .oneshot(post_json("/api/scraper/run", &json!({})))
        .await
        .expect("oneshot /api/scraper/run");
    assert!(resp.status().is_success());

    let v = json_body(resp).await;
    assert_eq!(v["totalScraped"], 1);
    assert_eq!(v["totalSaved"], 1);
    assert_eq!(v["sources"][0]["source"], "Test Wire");
    assert!(v.get("timestamp").is_some(), "missing 'timestamp'");

    // run recorded exactly once
    assert_eq!(state.ctx.store.run_count().unwrap(), 1);
}

#[tokio::test]
async fn api_schedule_lifecycle() {
    let (app, _) = test_router();

    // start
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "start", "interval": "hourly" }),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let v = json_body(resp).await;
    assert_eq!(v["status"], "running");
    assert!(v.get("nextRun").is_some());

    // second start: still running, no error
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "start", "interval": "hourly" }),
        ))
        .await
        .unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["status"], "running");
    assert_eq!(v["message"], "Scheduler is already running");

    // stop, then status reports stopped with nextRun null
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "stop" }),
        ))
        .await
        .unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["status"], "stopped");

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "status" }),
        ))
        .await
        .unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["status"], "stopped");
    assert!(v["nextRun"].is_null(), "nextRun must be null when stopped");
}

#[tokio::test]
async fn api_schedule_get_reports_state() {
    let (app, _) = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/api/scraper/schedule")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_success());

    let v = json_body(resp).await;
    assert_eq!(v["status"], "stopped");
    assert!(v["lastRun"].is_null());
    assert!(v["nextRun"].is_null());
}

#[tokio::test]
async fn api_schedule_rejects_unknown_action() {
    let (app, _) = test_router();

    let resp = app
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "reboot" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "Invalid action");
}

#[tokio::test]
async fn api_schedule_run_now_executes_once() {
    let (app, state) = test_router();

    let resp = app
        .oneshot(post_json(
            "/api/scraper/schedule",
            &json!({ "action": "run-now" }),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let v = json_body(resp).await;
    assert_eq!(v["message"], "Scraper executed immediately");
    assert_eq!(v["result"]["totalSaved"], 1);

    assert_eq!(state.ctx.store.run_count().unwrap(), 1);
    // run-now must not flip the scheduler into running
    assert_eq!(state.scheduler.status().status, "stopped");
}

#[tokio::test]
async fn api_test_probe_requires_test_url() {
    let (app, _) = test_router();

    let resp = app
        .oneshot(post_json("/api/scraper/test", &json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "testUrl is required");
}

#[tokio::test]
async fn api_test_probe_reports_extraction_samples() {
    let (app, _) = test_router();

    let resp = app
        .oneshot(post_json(
            "/api/scraper/test",
            &json!({ "testUrl": LISTING_URL }),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let v = json_body(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["summary"]["totalHeadlines"], 1);
    assert_eq!(v["summary"]["potentialLegalHeadlines"], 1);
    assert_eq!(v["sample"]["headlines"][0]["url"], "/law/case-1");
    assert!(v["sample"]["htmlStart"].as_str().unwrap().contains("<h2>"));
}

#[tokio::test]
async fn api_test_probe_surfaces_fetch_failures() {
    let (app, _) = test_router();

    let resp = app
        .oneshot(post_json(
            "/api/scraper/test",
            &json!({ "testUrl": "https://down.example.com/" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert!(v["error"]
        .as_str()
        .unwrap()
        .contains("Failed to fetch https://down.example.com/"));
}

#[tokio::test]
async fn api_runs_listing_and_pruning() {
    let (app, state) = test_router();

    // empty listing first
    let req = Request::builder()
        .method("GET")
        .uri("/api/scraper/runs?limit=5")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    let v = json_body(resp).await;
    assert_eq!(v["total"], 0);
    assert_eq!(v["stats"]["totalRuns"], 0);
    assert_eq!(v["pagination"]["hasMore"], false);

    // produce two runs through the API
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(post_json("/api/scraper/run", &json!({})))
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let req = Request::builder()
        .method("GET")
        .uri("/api/scraper/runs?limit=1&offset=0")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["total"], 2);
    assert_eq!(v["runs"].as_array().unwrap().len(), 1);
    assert_eq!(v["pagination"]["hasMore"], true);
    assert_eq!(v["stats"]["successfulRuns"], 2);

    // delete by id
    let id = v["runs"][0]["id"].as_i64().unwrap();
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/scraper/runs?id={id}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(state.ctx.store.run_count().unwrap(), 1);

    // missing parameters -> 400
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/scraper/runs")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "Missing id or olderThan parameter");
}
