// src/scrape/types.rs
use chrono::{DateTime, Utc};

/// A link lifted off a listing page. Transient: candidates live only for the
/// duration of one source's pipeline pass and are never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CandidateLink {
    pub title: String,
    /// Absolute URL, resolved against the source's base when the page used a
    /// relative href.
    pub url: String,
    pub source: String,
}

/// Per-source outcome within one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub scraped: usize,
    pub saved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one orchestrated run over all configured sources.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_scraped: usize,
    pub total_saved: usize,
    pub sources: Vec<SourceSummary>,
    pub timestamp: DateTime<Utc>,
}
