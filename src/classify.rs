// src/classify.rs
//! Article classification against an external LLM endpoint.
//!
//! The provider speaks the OpenAI chat-completions format with a JSON-schema
//! response contract; Gemini's compatibility surface is the default. Every
//! result passes through [`sanitize_analysis`], and any call failure is
//! replaced by [`fallback_analysis`] — classification can degrade an
//! article's metadata but never block its ingestion.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ai::ClassifierConfig;

/// Keyword list cap for one article.
pub const MAX_KEYWORDS: usize = 10;

/// Prompt body cap; listing bodies are already bounded, this bounds the spend.
const PROMPT_CONTENT_CHARS: usize = 3000;

const PRIORITIES: &[&str] = &["high", "medium", "low"];

/// Classification as the wire delivers it: every field optional, nothing
/// trusted until sanitized.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnalysis {
    pub summary: Option<String>,
    pub category: Option<String>,
    pub jurisdiction: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "impactScore")]
    pub impact_score: Option<i64>,
    pub insights: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Classification after sanitization; safe to persist as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub summary: String,
    pub category: String,
    pub jurisdiction: String,
    pub priority: String,
    pub impact_score: i64,
    pub insights: String,
    pub keywords: Vec<String>,
}

/// Clamp a raw classification into the persistable shape: impact score in
/// 1..=10 (5 when missing), priority coerced to high/medium/low, at most
/// [`MAX_KEYWORDS`] keywords, textual fields defaulted when absent.
pub fn sanitize_analysis(raw: RawAnalysis) -> ArticleAnalysis {
    let priority = match raw.priority {
        Some(p) if PRIORITIES.contains(&p.as_str()) => p,
        _ => "medium".to_string(),
    };

    let mut keywords = raw.keywords.unwrap_or_else(|| vec!["legal".to_string()]);
    keywords.truncate(MAX_KEYWORDS);

    ArticleAnalysis {
        summary: raw
            .summary
            .unwrap_or_else(|| "Summary not available".to_string()),
        category: raw.category.unwrap_or_else(|| "General Legal".to_string()),
        jurisdiction: raw.jurisdiction.unwrap_or_else(|| "Australia".to_string()),
        priority,
        impact_score: raw.impact_score.map_or(5, |s| s.clamp(1, 10)),
        insights: raw
            .insights
            .unwrap_or_else(|| "Analysis not available".to_string()),
        keywords,
    }
}

/// Fixed record substituted whenever the classifier call fails outright.
pub fn fallback_analysis() -> ArticleAnalysis {
    ArticleAnalysis {
        summary: "Summary not available".to_string(),
        category: "General Legal".to_string(),
        jurisdiction: "Australia".to_string(),
        priority: "medium".to_string(),
        impact_score: 5,
        insights: "Analysis unavailable".to_string(),
        keywords: vec!["legal".to_string()],
    }
}

/// Pluggable classification capability. The pipeline owns the fallback
/// contract, so implementations are free to just fail.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, title: &str, content: &str) -> Result<RawAnalysis>;
    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Factory: build a classifier from config. Disabled, unknown-provider, or
/// keyless configurations get the always-failing client so ingestion still
/// works with fallback metadata.
pub fn build_classifier(config: &ClassifierConfig) -> Arc<dyn Classifier> {
    if !config.enabled {
        return Arc::new(DisabledClassifier);
    }
    let Some(api_key) = config.resolve_api_key() else {
        tracing::warn!(
            provider = %config.provider,
            "classifier enabled but no API key resolved; falling back to disabled"
        );
        return Arc::new(DisabledClassifier);
    };
    match ChatCompletionsClassifier::for_provider(&config.provider, config.model.clone(), api_key) {
        Some(client) => Arc::new(client),
        None => {
            tracing::warn!(provider = %config.provider, "unsupported classifier provider");
            Arc::new(DisabledClassifier)
        }
    }
}

/// Always fails; the pipeline substitutes the fallback record.
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _title: &str, _content: &str) -> Result<RawAnalysis> {
        bail!("classifier disabled")
    }
    fn name(&self) -> &str {
        "disabled"
    }
}

/// Deterministic classifier for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct FixedClassifier {
    pub raw: RawAnalysis,
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _title: &str, _content: &str) -> Result<RawAnalysis> {
        Ok(self.raw.clone())
    }
    fn name(&self) -> &str {
        "fixed"
    }
}

/// HTTP classifier for OpenAI-format chat-completions endpoints.
pub struct ChatCompletionsClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    provider: String,
}

impl ChatCompletionsClassifier {
    pub fn new(provider: &str, endpoint: String, model: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("legal-news-harvester/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            model,
            api_key,
            provider: provider.to_string(),
        }
    }

    fn for_provider(provider: &str, model: Option<String>, api_key: String) -> Option<Self> {
        let (endpoint, default_model) = match provider {
            "gemini" => (
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "gemini-2.5-pro",
            ),
            "openai" => ("https://api.openai.com/v1/chat/completions", "gpt-4o-mini"),
            _ => return None,
        };
        Some(Self::new(
            provider,
            endpoint.to_string(),
            model.unwrap_or_else(|| default_model.to_string()),
            api_key,
        ))
    }
}

#[derive(Serialize)]
struct ChatMsg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<ChatMsg<'a>>,
    response_format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMsg,
}

#[derive(Deserialize)]
struct ChatChoiceMsg {
    content: String,
}

fn analysis_schema() -> serde_json::Value {
    json!({
        "name": "legal_article_analysis",
        "schema": {
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "category": { "type": "string" },
                "jurisdiction": { "type": "string" },
                "priority": { "type": "string" },
                "impactScore": { "type": "integer" },
                "insights": { "type": "string" },
                "keywords": { "type": "array", "items": { "type": "string" } }
            },
            "required": [
                "summary", "category", "jurisdiction", "priority",
                "impactScore", "insights", "keywords"
            ],
            "additionalProperties": false
        }
    })
}

#[async_trait]
impl Classifier for ChatCompletionsClassifier {
    async fn classify(&self, title: &str, content: &str) -> Result<RawAnalysis> {
        let body: String = content.chars().take(PROMPT_CONTENT_CHARS).collect();
        let user_prompt = format!(
            "Analyze this Australian legal news article and provide structured analysis:\n\n\
             Title: {title}\nContent: {body}\n\n\
             Please analyze and categorize this article."
        );

        let req = ChatReq {
            model: &self.model,
            messages: vec![
                ChatMsg {
                    role: "system",
                    content: "You are an expert Australian legal analyst. Analyze legal news \
                              articles and provide structured categorization and insights.",
                },
                ChatMsg {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": analysis_schema(),
            }),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("classifier request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("classifier returned HTTP {status}");
        }

        let parsed: ChatResp = resp.json().await.context("decoding classifier response")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        serde_json::from_str(content).context("parsing classifier analysis JSON")
    }

    fn name(&self) -> &str {
        &self.provider
    }
}
