// src/config/mod.rs
//! Scraper configuration: the ordered source list plus runtime settings.
//! Loaded from `config/scraper.toml` (or `$SCRAPER_CONFIG_PATH`); the
//! compiled-in defaults are the production Australian source set, so the
//! service runs out of the box.

pub mod ai;

pub use ai::ClassifierConfig;

use std::path::Path;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scrape::scheduler::Interval;

pub const ENV_CONFIG_PATH: &str = "SCRAPER_CONFIG_PATH";
pub const ENV_DATABASE_PATH: &str = "LEGAL_NEWS_DB";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; LegalNewsBot/1.0)";
pub const DEFAULT_DATABASE_PATH: &str = "data/legal_news.db";

/// Static per-site descriptor. Immutable at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Listing page to scan for candidate links.
    pub url: String,
    /// Base used to absolutize relative hrefs.
    pub base_url: String,
    /// Advisory extraction hint. The regex extractor does not interpret it;
    /// it documents where the links live when a human is debugging a source.
    #[serde(default)]
    pub selector: Option<String>,
    /// URL path fragment that marks legal content on this source. Sources
    /// without one rely on the keyword test alone.
    #[serde(default)]
    pub legal_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub default_interval: Interval,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            database_path: default_database_path(),
            default_interval: Interval::Hourly,
            sources: default_sources(),
        }
    }
}

impl ScraperConfig {
    /// Load using env override + fallbacks:
    /// 1) `$SCRAPER_CONFIG_PATH` (must exist)
    /// 2) `config/scraper.toml` when present
    /// 3) compiled-in defaults
    ///
    /// `$LEGAL_NEWS_DB` overrides the database path either way.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            Self::load_from(Path::new(&p))?
        } else {
            let default_path = Path::new("config/scraper.toml");
            if default_path.exists() {
                Self::load_from(default_path)?
            } else {
                Self::default()
            }
        };
        if let Ok(db) = env::var(ENV_DATABASE_PATH) {
            cfg.database_path = db;
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scraper config from {}", path.display()))?;
        let cfg = toml::from_str(&content)
            .with_context(|| format!("parsing scraper config {}", path.display()))?;
        Ok(cfg)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

/// The production source set: Australian outlets, courts and regulators that
/// publish legal news. Order matters — runs process sources in this order.
pub fn default_sources() -> Vec<SourceConfig> {
    const TABLE: &[(&str, &str, &str, &str, Option<&str>)] = &[
        (
            "The Guardian Australia",
            "https://www.theguardian.com/australia-news",
            "https://www.theguardian.com",
            "h3 a[href]",
            Some("/australia-news/"),
        ),
        (
            "ABC News Australia",
            "https://www.abc.net.au/news/topic/law-crime-and-justice",
            "https://www.abc.net.au",
            "a[href*='law']",
            Some("law-crime"),
        ),
        (
            "Sydney Morning Herald",
            "https://www.smh.com.au/topic/legal-affairs-1mgl",
            "https://www.smh.com.au",
            "a[href*='legal']",
            Some("legal-affairs"),
        ),
        (
            "The Australian",
            "https://www.theaustralian.com.au/nation/politics",
            "https://www.theaustralian.com.au",
            "a[href]",
            None,
        ),
        (
            "Australian Financial Review",
            "https://www.afr.com/policy",
            "https://www.afr.com",
            "a[href]",
            None,
        ),
        (
            "Lawyers Weekly",
            "https://www.lawyersweekly.com.au/news",
            "https://www.lawyersweekly.com.au",
            "a[href]",
            None,
        ),
        (
            "Australian Lawyer",
            "https://www.australianlawyer.com.au/news",
            "https://www.australianlawyer.com.au",
            "a[href]",
            None,
        ),
        (
            "Law Institute Journal",
            "https://www.liv.asn.au/news-and-media/news",
            "https://www.liv.asn.au",
            "a[href]",
            None,
        ),
        (
            "Federal Court of Australia",
            "https://www.fedcourt.gov.au/about/news-and-events/media-releases",
            "https://www.fedcourt.gov.au",
            "a[href]",
            None,
        ),
        (
            "High Court of Australia",
            "https://www.hcourt.gov.au/cases/recent-decisions",
            "https://www.hcourt.gov.au",
            "a[href]",
            None,
        ),
        (
            "ASIC Media Releases",
            "https://asic.gov.au/about-asic/news-centre/find-a-media-release/",
            "https://asic.gov.au",
            "a[href]",
            None,
        ),
        (
            "ACCC News",
            "https://www.accc.gov.au/media-and-publications/media-releases",
            "https://www.accc.gov.au",
            "a[href]",
            None,
        ),
    ];

    TABLE
        .iter()
        .map(|(name, url, base_url, selector, legal_path)| SourceConfig {
            name: (*name).to_string(),
            url: (*url).to_string(),
            base_url: (*base_url).to_string(),
            selector: Some((*selector).to_string()),
            legal_path: legal_path.map(str::to_string),
        })
        .collect()
}
