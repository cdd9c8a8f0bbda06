// src/scrape/extract.rs
//! Regex link extraction over raw listing HTML.
//!
//! There is deliberately no DOM parser here: the sites this feeds on are
//! heterogeneous and frequently malformed, and the original matching
//! semantics are defined in terms of ordered text-pattern rules. Headline
//! rules (anchors nested in heading markup) run first; the generic anchor
//! rules only run when the headline tier accepted nothing.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::SourceConfig;
use crate::scrape::relevance;
use crate::scrape::types::CandidateLink;

/// Hard cap on accepted candidates per page, to bound work against
/// adversarial or enormous listings.
pub const MAX_CANDIDATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTier {
    /// Anchors inside `<h1>`..`<h6>`; assumed higher quality.
    Headline,
    /// Any anchor with plausible inner text.
    Anchor,
}

/// One ordered text-pattern rule. Each match yields `(href, raw_title)`.
pub struct LinkRule {
    pub name: &'static str,
    pub tier: RuleTier,
    regex: Regex,
}

impl LinkRule {
    pub fn new(name: &'static str, tier: RuleTier, pattern: &str) -> Self {
        Self {
            name,
            tier,
            regex: Regex::new(pattern).expect("link rule regex"),
        }
    }

    /// Lazily iterate `(href, raw_title)` pairs in document order.
    pub fn matches<'h>(&'h self, html: &'h str) -> impl Iterator<Item = (String, String)> + 'h {
        self.regex.captures_iter(html).filter_map(|caps| {
            let href = caps.get(1)?.as_str().to_string();
            let title = caps.get(2)?.as_str().to_string();
            Some((href, title))
        })
    }
}

fn default_rules() -> Vec<LinkRule> {
    vec![
        LinkRule::new(
            "headline-nested-anchor",
            RuleTier::Headline,
            r#"(?is)<h[1-6][^>]*>.*?<a[^>]*href="([^"]*)"[^>]*>([^<]+)</a>.*?</h[1-6]>"#,
        ),
        LinkRule::new(
            "headline-direct-anchor",
            RuleTier::Headline,
            r#"(?is)<h[1-6][^>]*><a[^>]*href="([^"]*)"[^>]*>([^<]+)</a></h[1-6]>"#,
        ),
        LinkRule::new(
            "anchor-double-quoted",
            RuleTier::Anchor,
            r#"(?is)<a[^>]*href="([^"]*)"[^>]*>([^<]{20,200})</a>"#,
        ),
        LinkRule::new(
            "anchor-single-quoted",
            RuleTier::Anchor,
            r#"(?is)<a[^>]*href='([^']*)'[^>]*>([^<]{20,200})</a>"#,
        ),
    ]
}

/// Ordered-rule extractor. Re-invoking re-parses from scratch; nothing is
/// cached between pages.
pub struct Extractor {
    rules: Vec<LinkRule>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Extractor {
    pub fn new(rules: Vec<LinkRule>) -> Self {
        Self { rules }
    }

    /// Run the rule tiers against `html` and return at most
    /// [`MAX_CANDIDATES`] accepted candidates. An accepted URL is never
    /// yielded twice for the same page (first match wins).
    pub fn extract(&self, html: &str, source: &SourceConfig) -> Vec<CandidateLink> {
        let mut accepted: Vec<CandidateLink> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for tier in [RuleTier::Headline, RuleTier::Anchor] {
            // The generic anchor tier is a fallback for pages without
            // heading-wrapped links.
            if tier == RuleTier::Anchor && !accepted.is_empty() {
                break;
            }
            for rule in self.rules.iter().filter(|r| r.tier == tier) {
                for (href, raw_title) in rule.matches(html) {
                    if accepted.len() >= MAX_CANDIDATES {
                        return accepted;
                    }
                    let title = normalize_title(&raw_title);
                    if title.is_empty() {
                        continue;
                    }
                    if !relevance::is_relevant(&title, &href, source.legal_path.as_deref()) {
                        continue;
                    }
                    if !seen.insert(href.clone()) {
                        continue;
                    }
                    accepted.push(CandidateLink {
                        title,
                        url: absolutize(&href, &source.base_url),
                        source: source.name.clone(),
                    });
                }
            }
        }

        accepted
    }
}

/// Normalize a raw anchor title: trim, decode the fixed entity set the
/// extractor understands, collapse internal whitespace.
pub fn normalize_title(raw: &str) -> String {
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

    let decoded = raw
        .trim()
        .replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Resolve `href` against the source's base URL when it is not already
/// absolute.
pub fn absolutize(href: &str, base_url: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            href.trim_start_matches('/')
        ),
    }
}

/// Raw sample link surfaced by the diagnostic probe endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProbeLink {
    pub url: String,
    pub title: String,
}

/// Sample up to `cap` generic anchors, with the loose title-length filter the
/// probe applies instead of the full relevance gate.
pub fn probe_links(html: &str, cap: usize) -> Vec<ProbeLink> {
    static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?is)<a[^>]*href="([^"]*)"[^>]*>([^<]+)</a>"#).expect("probe anchor regex")
    });
    RE_ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let url = caps.get(1)?.as_str();
            let title = caps.get(2)?.as_str().trim();
            let len = title.chars().count();
            if len > 10 && len < 200 {
                Some(ProbeLink {
                    url: clip(url, 100),
                    title: clip(title, 100),
                })
            } else {
                None
            }
        })
        .take(cap)
        .collect()
}

/// Sample up to `cap` heading-wrapped anchors.
pub fn probe_headlines(html: &str, cap: usize) -> Vec<ProbeLink> {
    static RE_HEADLINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?is)<h[1-6][^>]*>.*?<a[^>]*href="([^"]*)"[^>]*>([^<]+)</a>.*?</h[1-6]>"#)
            .expect("probe headline regex")
    });
    RE_HEADLINE
        .captures_iter(html)
        .filter_map(|caps| {
            Some(ProbeLink {
                url: clip(caps.get(1)?.as_str(), 100),
                title: clip(caps.get(2)?.as_str().trim(), 100),
            })
        })
        .take(cap)
        .collect()
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
