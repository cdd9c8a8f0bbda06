//! Legal News Harvester — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the scraper pipeline, scheduler,
//! store, and metrics behind the admin API.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use legal_news_harvester::classify::{self, Classifier as _};
use legal_news_harvester::config::{ClassifierConfig, ScraperConfig};
use legal_news_harvester::metrics::Metrics;
use legal_news_harvester::scrape::extract::Extractor;
use legal_news_harvester::scrape::fetch::{HttpFetcher, PageFetcher};
use legal_news_harvester::scrape::scheduler::ScrapeScheduler;
use legal_news_harvester::scrape::ScrapeContext;
use legal_news_harvester::store::Store;
use legal_news_harvester::{api, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("legal_news_harvester=info,warn"));

    // try_init: Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ScraperConfig::load().expect("Failed to load scraper config");
    let ai_cfg = ClassifierConfig::load();

    let store = Store::open(&cfg.database_path).expect("Failed to open article store");
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&cfg.user_agent));
    let classifier = classify::build_classifier(&ai_cfg);

    tracing::info!(
        sources = cfg.sources.len(),
        classifier = classifier.name(),
        interval = cfg.default_interval.as_str(),
        "legal news harvester starting"
    );

    let ctx = Arc::new(ScrapeContext {
        sources: cfg.sources.clone(),
        fetcher,
        classifier,
        extractor: Extractor::default(),
        store,
    });
    let scheduler = Arc::new(ScrapeScheduler::new(Arc::clone(&ctx), cfg.default_interval));

    let metrics = Metrics::init(cfg.default_interval.secs());
    let router = api::router(AppState { ctx, scheduler }).merge(metrics.router());

    Ok(router.into())
}
