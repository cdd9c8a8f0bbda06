// src/scrape/relevance.rs
//! Relevance gate for extracted links: length bounds, a chrome-word denylist,
//! then a per-source path rule or the legal keyword list.

/// Titles outside this range are navigation fragments or walls of text.
pub const TITLE_MIN_CHARS: usize = 15;
pub const TITLE_MAX_CHARS: usize = 300;

/// Site chrome that never headlines an article.
const SKIP_WORDS: &[&str] = &[
    "subscribe",
    "login",
    "register",
    "newsletter",
    "contact",
    "about",
    "privacy",
    "terms",
    "cookie",
    "more articles",
    "view all",
    "home",
    "search",
    "menu",
    "navigation",
    "footer",
    "header",
];

const LEGAL_KEYWORDS: &[&str] = &[
    "law",
    "legal",
    "court",
    "judge",
    "justice",
    "attorney",
    "lawyer",
    "legislation",
    "regulation",
    "ruling",
    "verdict",
    "case",
    "trial",
    "parliament",
    "government",
    "policy",
    "rights",
    "crime",
    "criminal",
    "civil",
    "constitutional",
    "supreme",
    "federal",
    "appeal",
];

/// Accept a candidate when its title passes the noise gates and either the
/// source's own URL path rule or the legal keyword list matches. Rules apply
/// in order; the first failing rule rejects.
pub fn is_relevant(title: &str, url: &str, legal_path: Option<&str>) -> bool {
    let len = title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
        return false;
    }

    let title_lower = title.to_lowercase();
    if SKIP_WORDS.iter().any(|w| title_lower.contains(w)) {
        return false;
    }

    if let Some(path) = legal_path {
        if url.contains(path) {
            return true;
        }
    }

    has_legal_keyword(&title_lower, &url.to_lowercase())
}

/// True when any legal keyword occurs in the (lowercased) title or URL.
/// Also used by the diagnostic probe endpoint to flag samples.
pub fn has_legal_keyword(title_lower: &str, url_lower: &str) -> bool {
    LEGAL_KEYWORDS
        .iter()
        .any(|k| title_lower.contains(k) || url_lower.contains(k))
}

/// Convenience for the probe: flag a raw (title, url) pair.
pub fn is_legal_flagged(title: &str, url: &str) -> bool {
    has_legal_keyword(&title.to_lowercase(), &url.to_lowercase())
}
