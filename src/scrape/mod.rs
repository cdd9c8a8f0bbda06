// src/scrape/mod.rs
//! Ingestion pipeline: fetch listing → extract links → dedup gate → fetch
//! content → classify → persist, orchestrated sequentially over the
//! configured sources.

pub mod extract;
pub mod fetch;
pub mod relevance;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
// `::` disambiguates the metrics crate from the crate-level metrics module.
use ::metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::classify::{self, Classifier};
use crate::config::SourceConfig;
use crate::scrape::extract::Extractor;
use crate::scrape::fetch::PageFetcher;
use crate::scrape::types::{CandidateLink, RunSummary, SourceSummary};
use crate::store::{NewArticle, NewRun, Store};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_runs_total", "Orchestrated scrape runs completed.");
        describe_counter!(
            "scrape_candidates_total",
            "Candidate links accepted by extraction across all sources."
        );
        describe_counter!(
            "scrape_articles_saved_total",
            "Articles persisted (duplicates excluded)."
        );
        describe_counter!(
            "scrape_source_errors_total",
            "Sources that failed within a run."
        );
        describe_gauge!(
            "scrape_last_run_ts",
            "Unix ts when the last scrape run finished."
        );
    });
}

/// Everything one run needs. Built once at startup; tests build their own
/// with mock fetchers/classifiers and in-memory stores.
pub struct ScrapeContext {
    pub sources: Vec<SourceConfig>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub classifier: Arc<dyn Classifier>,
    pub extractor: Extractor,
    pub store: Store,
}

/// Scrape one source end to end. Returns its summary; any error here is the
/// source's own failure and is caught by [`run_all`].
pub async fn scrape_source(ctx: &ScrapeContext, source: &SourceConfig) -> Result<SourceSummary> {
    tracing::info!(source = %source.name, url = %source.url, "scraping source");

    let html = ctx
        .fetcher
        .fetch(&source.url)
        .await
        .with_context(|| format!("fetching listing for {}", source.name))?;

    let candidates = ctx.extractor.extract(&html, source);
    if candidates.is_empty() {
        // Best effort only; keep the page prefix around for rule debugging.
        let prefix: String = html.chars().take(500).collect();
        tracing::debug!(source = %source.name, html_prefix = %prefix, "no candidates extracted");
    }

    let mut saved = 0usize;
    for candidate in &candidates {
        match save_candidate(ctx, candidate).await {
            Ok(true) => saved += 1,
            Ok(false) => {
                tracing::debug!(title = %candidate.title, "skipping duplicate");
            }
            Err(e) => {
                // One bad article must not sink the rest of the source.
                tracing::warn!(error = ?e, title = %candidate.title, "failed to save article");
            }
        }
    }

    tracing::info!(
        source = %source.name,
        scraped = candidates.len(),
        saved,
        "source complete"
    );

    Ok(SourceSummary {
        source: source.name.clone(),
        scraped: candidates.len(),
        saved,
        error: None,
    })
}

/// Enrich and persist a single accepted candidate. `Ok(false)` means the
/// article was already known (by title or URL) and nothing was written.
async fn save_candidate(ctx: &ScrapeContext, candidate: &CandidateLink) -> Result<bool> {
    if ctx.store.article_exists(&candidate.title, &candidate.url)? {
        return Ok(false);
    }

    let content = fetch::fetch_article_text(ctx.fetcher.as_ref(), &candidate.url).await;

    let analysis = match ctx.classifier.classify(&candidate.title, &content).await {
        Ok(raw) => classify::sanitize_analysis(raw),
        Err(e) => {
            tracing::warn!(error = ?e, title = %candidate.title, "classification failed, using fallback");
            classify::fallback_analysis()
        }
    };

    ctx.store.insert_article(&NewArticle {
        title: candidate.title.clone(),
        content,
        summary: analysis.summary,
        source: candidate.source.clone(),
        source_url: candidate.url.clone(),
        published_at: Utc::now(),
        category: analysis.category,
        jurisdiction: analysis.jurisdiction,
        priority: analysis.priority,
        impact_score: analysis.impact_score,
        ai_insights: analysis.insights,
        keywords: analysis.keywords,
    })
}

/// Run every configured source in order. A source's failure is recorded in
/// its summary entry and the loop continues; the run itself cannot fail here.
pub async fn run_all(ctx: &ScrapeContext) -> RunSummary {
    ensure_metrics_described();

    let mut sources = Vec::with_capacity(ctx.sources.len());
    let mut total_scraped = 0usize;
    let mut total_saved = 0usize;

    for source in &ctx.sources {
        match scrape_source(ctx, source).await {
            Ok(summary) => {
                total_scraped += summary.scraped;
                total_saved += summary.saved;
                counter!("scrape_candidates_total").increment(summary.scraped as u64);
                counter!("scrape_articles_saved_total").increment(summary.saved as u64);
                sources.push(summary);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.name, "source scrape failed");
                counter!("scrape_source_errors_total").increment(1);
                sources.push(SourceSummary {
                    source: source.name.clone(),
                    scraped: 0,
                    saved: 0,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }

    let timestamp = Utc::now();
    counter!("scrape_runs_total").increment(1);
    gauge!("scrape_last_run_ts").set(timestamp.timestamp() as f64);

    RunSummary {
        total_scraped,
        total_saved,
        sources,
        timestamp,
    }
}

/// Run every source and persist exactly one run record for the invocation.
/// If the summary itself cannot be persisted, an error-status record is
/// attempted with the accumulated counts before the error propagates.
pub async fn run_and_record(ctx: &ScrapeContext) -> Result<RunSummary> {
    let summary = run_all(ctx).await;

    let details = serde_json::to_string(&summary).ok();
    let recorded = ctx.store.insert_run(&NewRun {
        run_time: summary.timestamp,
        status: "success".to_string(),
        articles_scraped: summary.total_scraped as i64,
        articles_saved: summary.total_saved as i64,
        details,
        error_message: None,
    });

    match recorded {
        Ok(_) => {
            tracing::info!(
                total_scraped = summary.total_scraped,
                total_saved = summary.total_saved,
                "scrape run recorded"
            );
            Ok(summary)
        }
        Err(e) => {
            let message = format!("{e:#}");
            if let Err(e2) = ctx.store.insert_run(&NewRun {
                run_time: summary.timestamp,
                status: "error".to_string(),
                articles_scraped: summary.total_scraped as i64,
                articles_saved: summary.total_saved as i64,
                details: None,
                error_message: Some(message),
            }) {
                tracing::error!(error = ?e2, "failed to record error-status run");
            }
            Err(e.context("recording scraper run"))
        }
    }
}
