// src/api.rs
//! Admin HTTP surface for the scraper: manual runs, scheduler control, the
//! single-URL extraction probe, and run-history queries. Payload field names
//! are camelCase for the dashboard that consumes this API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::scrape::fetch::PageFetcher as _;
use crate::scrape::scheduler::{Interval, ScrapeScheduler};
use crate::scrape::types::RunSummary;
use crate::scrape::{self, extract, relevance, ScrapeContext};

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ScrapeContext>,
    pub scheduler: Arc<ScrapeScheduler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/scraper/run", post(run_scraper))
        .route(
            "/api/scraper/schedule",
            post(schedule_action).get(schedule_status),
        )
        .route("/api/scraper/test", post(test_extraction))
        .route("/api/scraper/runs", get(list_runs).delete(delete_runs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let mut body = json!({ "error": error });
    if let Some(d) = details {
        body["details"] = json!(d);
    }
    (status, Json(body)).into_response()
}

// ---- POST /api/scraper/run ----

async fn run_scraper(State(state): State<AppState>) -> Response {
    tracing::info!("manual scrape run requested");
    match scrape::run_and_record(&state.ctx).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Scraper failed",
            Some(format!("{e:#}")),
        ),
    }
}

// ---- /api/scraper/schedule ----

#[derive(serde::Deserialize)]
struct ScheduleReq {
    action: String,
    #[serde(default)]
    interval: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResp {
    message: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_run: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
struct RunNowResp {
    message: String,
    result: RunSummary,
}

async fn schedule_action(
    State(state): State<AppState>,
    Json(req): Json<ScheduleReq>,
) -> Response {
    match req.action.as_str() {
        "start" => {
            let interval = req
                .interval
                .as_deref()
                .map(Interval::parse)
                .unwrap_or_else(|| state.scheduler.default_interval());
            let (started, status) = state.scheduler.start(interval);
            let message = if started {
                "Scheduler started successfully"
            } else {
                "Scheduler is already running"
            };
            Json(ScheduleResp {
                message: message.to_string(),
                status: status.status,
                interval: Some(state.scheduler.interval().as_str()),
                last_run: status.last_run,
                next_run: status.next_run,
            })
            .into_response()
        }
        "stop" => {
            state.scheduler.stop();
            Json(ScheduleResp {
                message: "Scheduler stopped".to_string(),
                status: "stopped",
                interval: None,
                last_run: None,
                next_run: None,
            })
            .into_response()
        }
        "status" => Json(state.scheduler.status()).into_response(),
        "run-now" => match state.scheduler.run_now().await {
            Ok(result) => Json(RunNowResp {
                message: "Scraper executed immediately".to_string(),
                result,
            })
            .into_response(),
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Scraper failed",
                Some(format!("{e:#}")),
            ),
        },
        _ => error_response(StatusCode::BAD_REQUEST, "Invalid action", None),
    }
}

async fn schedule_status(State(state): State<AppState>) -> Response {
    Json(state.scheduler.status()).into_response()
}

// ---- POST /api/scraper/test ----

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestReq {
    #[serde(default)]
    test_url: Option<String>,
}

async fn test_extraction(State(state): State<AppState>, Json(req): Json<TestReq>) -> Response {
    let Some(test_url) = req.test_url.filter(|u| !u.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "testUrl is required", None);
    };

    tracing::info!(url = %test_url, "extraction probe requested");
    let html = match state.ctx.fetcher.fetch(&test_url).await {
        Ok(html) => html,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to fetch {test_url}"),
                Some(e.to_string()),
            );
        }
    };

    let links = extract::probe_links(&html, 20);
    let headlines = extract::probe_headlines(&html, 10);

    let legal_links: Vec<_> = links
        .iter()
        .filter(|l| relevance::is_legal_flagged(&l.title, &l.url))
        .cloned()
        .collect();
    let legal_headlines: Vec<_> = headlines
        .iter()
        .filter(|l| relevance::is_legal_flagged(&l.title, &l.url))
        .cloned()
        .collect();

    let html_start: String = html.chars().take(1000).collect();
    Json(json!({
        "success": true,
        "url": test_url,
        "htmlLength": html.len(),
        "summary": {
            "totalLinks": links.len(),
            "totalHeadlines": headlines.len(),
            "potentialLegalLinks": legal_links.len(),
            "potentialLegalHeadlines": legal_headlines.len(),
        },
        "sample": {
            "htmlStart": html_start,
            "links": links.iter().take(10).collect::<Vec<_>>(),
            "headlines": headlines,
            "potentialLegalLinks": legal_links.iter().take(10).collect::<Vec<_>>(),
            "potentialLegalHeadlines": legal_headlines,
        },
    }))
    .into_response()
}

// ---- /api/scraper/runs ----

#[derive(serde::Deserialize)]
struct RunsQuery {
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

async fn list_runs(State(state): State<AppState>, Query(q): Query<RunsQuery>) -> Response {
    let limit = q.limit.unwrap_or(20).max(1);
    let offset = q.offset.unwrap_or(0).max(0);

    let listing = state
        .ctx
        .store
        .list_runs(limit, offset)
        .and_then(|runs| {
            let total = state.ctx.store.run_count()?;
            let stats = state.ctx.store.run_stats()?;
            Ok((runs, total, stats))
        });

    match listing {
        Ok((runs, total, stats)) => Json(json!({
            "runs": runs,
            "total": total,
            "stats": stats,
            "pagination": {
                "limit": limit,
                "offset": offset,
                "hasMore": (offset + limit < total),
            },
        }))
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch scraper runs",
            Some(format!("{e:#}")),
        ),
    }
}

async fn delete_runs(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if let Some(id) = q.get("id") {
        let Ok(id) = id.parse::<i64>() else {
            return error_response(StatusCode::BAD_REQUEST, "Invalid id parameter", None);
        };
        return match state.ctx.store.delete_run(id) {
            Ok(_) => Json(json!({ "message": "Scraper run deleted successfully" })).into_response(),
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete scraper runs",
                Some(format!("{e:#}")),
            ),
        };
    }

    if let Some(days) = q.get("olderThan") {
        let Ok(days) = days.parse::<i64>() else {
            return error_response(StatusCode::BAD_REQUEST, "Invalid olderThan parameter", None);
        };
        return match state.ctx.store.delete_runs_older_than(days) {
            Ok(n) => Json(json!({
                "message": format!("Deleted {n} scraper runs older than {days} days"),
            }))
            .into_response(),
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete scraper runs",
                Some(format!("{e:#}")),
            ),
        };
    }

    error_response(
        StatusCode::BAD_REQUEST,
        "Missing id or olderThan parameter",
        None,
    )
}
