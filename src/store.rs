// src/store.rs
//! SQLite-backed storage for articles and scraper-run history.
//!
//! Uniqueness of articles lives in the schema (UNIQUE on title and on
//! source_url) and inserts are conditional, so the application-level
//! duplicate pre-check is an optimization, not the guarantee — two
//! overlapping runs cannot double-insert.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Article row as the pipeline writes it.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub source: String,
    pub source_url: String,
    /// Fetch time, not the original publish time.
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub jurisdiction: String,
    pub priority: String,
    pub impact_score: i64,
    pub ai_insights: String,
    pub keywords: Vec<String>,
}

/// Article row as read back (admin views, tests).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub source: String,
    pub source_url: String,
    pub published_at: String,
    pub category: String,
    pub jurisdiction: String,
    pub priority: String,
    pub impact_score: i64,
    pub ai_insights: String,
    pub keywords: Vec<String>,
    pub view_count: i64,
}

/// Run record as the orchestrator writes it.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub run_time: DateTime<Utc>,
    pub status: String,
    pub articles_scraped: i64,
    pub articles_saved: i64,
    /// Per-source breakdown, JSON.
    pub details: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: i64,
    pub run_time: String,
    pub status: String,
    pub articles_scraped: i64,
    pub articles_saved: i64,
    pub details: Option<Value>,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total_runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    pub total_articles_scraped: i64,
    pub total_articles_saved: i64,
    pub last_run_time: Option<String>,
}

/// Shared handle over one SQLite connection. Methods are synchronous and
/// hold the lock only for the duration of a single statement.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database dir {}", parent.display()))?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening database at {db_path}"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
              id INTEGER PRIMARY KEY,
              title TEXT NOT NULL UNIQUE,
              content TEXT NOT NULL,
              summary TEXT NOT NULL,
              source TEXT NOT NULL,
              source_url TEXT NOT NULL UNIQUE,
              published_at TEXT NOT NULL,
              category TEXT NOT NULL,
              jurisdiction TEXT NOT NULL,
              priority TEXT NOT NULL,
              impact_score INTEGER NOT NULL,
              ai_insights TEXT NOT NULL,
              keywords TEXT NOT NULL,
              view_count INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            CREATE TABLE IF NOT EXISTS scraper_runs (
              id INTEGER PRIMARY KEY,
              run_time TEXT NOT NULL,
              status TEXT NOT NULL,
              articles_scraped INTEGER NOT NULL,
              articles_saved INTEGER NOT NULL,
              details TEXT,
              error_message TEXT,
              created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
            );

            CREATE INDEX IF NOT EXISTS idx_scraper_runs_run_time ON scraper_runs(run_time);
            "#,
        )?;
        Ok(())
    }

    /// Duplicate gate: exact title or exact source URL already persisted.
    pub fn article_exists(&self, title: &str, source_url: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM articles WHERE title = ?1 OR source_url = ?2 LIMIT 1",
                params![title, source_url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Conditional insert. Returns false (and writes nothing) when the row
    /// collides with an existing title or source URL.
    pub fn insert_article(&self, article: &NewArticle) -> Result<bool> {
        let keywords_json = serde_json::to_string(&article.keywords)?;
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            r#"
            INSERT INTO articles (
              title, content, summary, source, source_url, published_at,
              category, jurisdiction, priority, impact_score, ai_insights, keywords
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT DO NOTHING
            "#,
            params![
                article.title,
                article.content,
                article.summary,
                article.source,
                article.source_url,
                article.published_at.to_rfc3339(),
                article.category,
                article.jurisdiction,
                article.priority,
                article.impact_score,
                article.ai_insights,
                keywords_json,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn article_count(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let n = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn find_article_by_url(&self, source_url: &str) -> Result<Option<ArticleRecord>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let record = conn
            .query_row(
                r#"
                SELECT id, title, content, summary, source, source_url, published_at,
                       category, jurisdiction, priority, impact_score, ai_insights,
                       keywords, view_count
                FROM articles WHERE source_url = ?1
                "#,
                params![source_url],
                Self::map_article,
            )
            .optional()?;
        Ok(record)
    }

    fn map_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArticleRecord> {
        let keywords_json: String = row.get(12)?;
        Ok(ArticleRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            summary: row.get(3)?,
            source: row.get(4)?,
            source_url: row.get(5)?,
            published_at: row.get(6)?,
            category: row.get(7)?,
            jurisdiction: row.get(8)?,
            priority: row.get(9)?,
            impact_score: row.get(10)?,
            ai_insights: row.get(11)?,
            keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
            view_count: row.get(13)?,
        })
    }

    pub fn insert_run(&self, run: &NewRun) -> Result<i64> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO scraper_runs (
              run_time, status, articles_scraped, articles_saved, details, error_message
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                run.run_time.to_rfc3339(),
                run.status,
                run.articles_scraped,
                run.articles_saved,
                run.details,
                run.error_message,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<RunRecord>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT id, run_time, status, articles_scraped, articles_saved,
                   details, error_message, created_at
            FROM scraper_runs
            ORDER BY run_time DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            let details_json: Option<String> = row.get(5)?;
            Ok(RunRecord {
                id: row.get(0)?,
                run_time: row.get(1)?,
                status: row.get(2)?,
                articles_scraped: row.get(3)?,
                articles_saved: row.get(4)?,
                details: details_json.and_then(|d| serde_json::from_str(&d).ok()),
                error_message: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn run_count(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let n = conn.query_row("SELECT COUNT(*) FROM scraper_runs", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn run_stats(&self) -> Result<RunStats> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let stats = conn.query_row(
            r#"
            SELECT
              COUNT(*),
              COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
              COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0),
              COALESCE(SUM(articles_scraped), 0),
              COALESCE(SUM(articles_saved), 0),
              MAX(run_time)
            FROM scraper_runs
            "#,
            [],
            |row| {
                Ok(RunStats {
                    total_runs: row.get(0)?,
                    successful_runs: row.get(1)?,
                    failed_runs: row.get(2)?,
                    total_articles_scraped: row.get(3)?,
                    total_articles_saved: row.get(4)?,
                    last_run_time: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Returns true when a row was deleted.
    pub fn delete_run(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute("DELETE FROM scraper_runs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Retention pruning. Returns the number of rows removed.
    pub fn delete_runs_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = (Utc::now() - TimeDelta::days(days)).to_rfc3339();
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            "DELETE FROM scraper_runs WHERE run_time < ?1",
            params![cutoff],
        )?;
        Ok(changed)
    }
}
