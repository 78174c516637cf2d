//! End-to-end pipeline properties against a temporary file-backed store.
//!
//! The search and article capabilities are stubbed so no network is
//! involved; everything else (staging, anti-join resumption, materialize,
//! export) runs the real code paths.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use presswatch::article::{ArticleError, ArticleFetcher};
use presswatch::config::{self, Config};
use presswatch::error::PipelineError;
use presswatch::models::{ArticleContent, SourceRecord};
use presswatch::search_api::{SearchPage, SearchProvider};
use presswatch::{db, enrich, export, extract, fetch, materialize, migrate, outlets};

fn test_config(root: &Path) -> Config {
    let config_body = format!(
        r#"[db]
path = "{root}/data/presswatch.sqlite"

[search]
keywords = ["badger"]
start_date = "2025-01-01"

[enrich]
request_delay_ms = 0
checkpoint_every = 10

[export]
out_dir = "{root}/out"
"#,
        root = root.display()
    );
    let config_path = root.join("presswatch.toml");
    std::fs::write(&config_path, config_body).unwrap();
    config::load_config(&config_path).unwrap()
}

async fn setup() -> (TempDir, Config, SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(tmp.path());
    migrate::run_migrations(&cfg).await.unwrap();
    let pool = db::connect(&cfg).await.unwrap();
    (tmp, cfg, pool)
}

fn record(id: &str, publish: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        indexed_at: Utc::now(),
        publish_date: Some(
            NaiveDate::parse_from_str(publish, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc(),
        ),
        title: format!("Story {}", id),
        url: format!("https://example.com/{}", id),
        language: "en".to_string(),
        media_name: "Example News".to_string(),
        media_url: "example.com".to_string(),
    }
}

/// Serves predefined pages; the continuation token is the next page index.
struct StubSearch {
    pages: Vec<Vec<SourceRecord>>,
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search_page(
        &self,
        _query: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _collections: &[i64],
        page_token: Option<&str>,
    ) -> Result<SearchPage, PipelineError> {
        let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let page = self.pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < self.pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Ok((page, next))
    }
}

/// Returns canned article text per URL, failing for listed URLs. Counts
/// calls so tests can assert nothing is ever reprocessed.
#[derive(Default)]
struct StubFetcher {
    texts: HashMap<String, String>,
    fail: HashSet<String>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn with_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), text.to_string());
        self
    }

    fn with_failure(mut self, url: &str) -> Self {
        self.fail.insert(url.to_string());
        self
    }
}

#[async_trait]
impl ArticleFetcher for StubFetcher {
    async fn fetch_and_parse(&self, url: &str) -> Result<ArticleContent, ArticleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.contains(url) {
            return Err(ArticleError::Status(404));
        }
        Ok(ArticleContent {
            title: "A Title".to_string(),
            text: self.texts.get(url).cloned().unwrap_or_default(),
            publish_date: None,
            authors: "Jane Reporter".to_string(),
            top_image: String::new(),
            summary: String::new(),
        })
    }
}

#[tokio::test]
async fn staging_is_idempotent() {
    let (_tmp, _cfg, pool) = setup().await;
    let batch = vec![record("a", "2025-02-01"), record("b", "2025-02-02")];

    let first = fetch::stage(&pool, &batch).await.unwrap();
    assert_eq!(first, 2);

    let second = fetch::stage(&pool, &batch).await.unwrap();
    assert_eq!(second, 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stage_story")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn fetch_accumulates_all_pages_before_staging() {
    let (_tmp, cfg, pool) = setup().await;
    let provider = StubSearch {
        pages: vec![
            vec![record("a", "2025-02-01"), record("b", "2025-02-02")],
            // "b" repeats across pages; only one row may land.
            vec![record("b", "2025-02-02"), record("c", "2025-02-03")],
        ],
    };

    let report = fetch::fetch_and_stage(&pool, &cfg, &provider, None, None)
        .await
        .unwrap();
    assert_eq!(report.fetched, 4);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.duplicates, 1);
}

#[tokio::test]
async fn watermark_bounds_the_next_window() {
    let (_tmp, cfg, pool) = setup().await;

    // Empty store: window starts at the configured floor.
    let start = fetch::fetch_window_start(&pool, &cfg).await.unwrap();
    assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

    let batch = vec![record("a", "2025-02-01"), record("b", "2025-03-15")];
    fetch::stage(&pool, &batch).await.unwrap();

    let mark = fetch::watermark(&pool).await.unwrap().unwrap();
    assert_eq!(mark.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());

    // Next window never re-requests the full historical range.
    let start = fetch::fetch_window_start(&pool, &cfg).await.unwrap();
    assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
}

#[tokio::test]
async fn enricher_resumes_without_reprocessing() {
    let (_tmp, cfg, pool) = setup().await;
    let batch: Vec<SourceRecord> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| record(id, "2025-02-01"))
        .collect();
    fetch::stage(&pool, &batch).await.unwrap();

    let fetcher = StubFetcher::default();

    // Interrupted run: only 2 of 5 processed.
    let report = enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, Some(2))
        .await
        .unwrap();
    assert_eq!(report.found, 2);

    // Resumed run processes exactly the remaining 3.
    let report = enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();
    assert_eq!(report.found, 3);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);

    // Everything enriched; a further run is a no-op.
    let report = enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();
    assert_eq!(report.found, 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn enrichment_failure_is_recorded_as_data() {
    let (_tmp, cfg, pool) = setup().await;
    let batch = vec![record("ok", "2025-02-01"), record("bad", "2025-02-02")];
    fetch::stage(&pool, &batch).await.unwrap();

    let fetcher = StubFetcher::default()
        .with_text("https://example.com/ok", "The badger appears here.")
        .with_failure("https://example.com/bad");

    let report = enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let (success, error): (bool, Option<String>) = sqlx::query_as(
        "SELECT success, error FROM stage_enrichment WHERE story_id = 'bad'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(!success);
    assert_eq!(error.as_deref(), Some("StatusError: HTTP 404"));

    // Failed stories are not pending anymore: no endless retry.
    let report = enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();
    assert_eq!(report.found, 0);
}

#[tokio::test]
async fn extractor_stores_longest_match_and_placeholders() {
    let (_tmp, cfg, pool) = setup().await;
    let batch = vec![
        record("hit", "2025-02-01"),
        record("miss", "2025-02-02"),
        record("empty", "2025-02-03"),
    ];
    fetch::stage(&pool, &batch).await.unwrap();

    let fetcher = StubFetcher::default()
        .with_text(
            "https://example.com/hit",
            "A badger. The badger dug a very long den today! Short badger one.",
        )
        .with_text("https://example.com/miss", "Nothing relevant in this text.")
        .with_failure("https://example.com/empty");
    enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();

    let processed = extract::extract_pending(&pool, &cfg.search.keywords)
        .await
        .unwrap();
    // The failed story has empty text and is skipped entirely.
    assert_eq!(processed, 2);

    let sentence: String =
        sqlx::query_scalar("SELECT sentence FROM stage_sentence WHERE story_id = 'hit'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(sentence, "The badger dug a very long den today!");

    // No match still writes a row, with an empty string, not NULL.
    let sentence: String =
        sqlx::query_scalar("SELECT sentence FROM stage_sentence WHERE story_id = 'miss'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(sentence, "");

    // Already-processed stories are not re-scanned.
    let processed = extract::extract_pending(&pool, &cfg.search.keywords)
        .await
        .unwrap();
    assert_eq!(processed, 0);
}

#[tokio::test]
async fn materialization_is_complete_and_replaces_prior_view() {
    let (tmp, cfg, pool) = setup().await;

    let outlet_csv = tmp.path().join("outlets.csv");
    std::fs::write(
        &outlet_csv,
        "media_url,name,bias_rating\nexample.com,Example,Center\n",
    )
    .unwrap();
    outlets::load_outlets(&pool, &outlet_csv).await.unwrap();

    // "alpha" sorts first, so `--limit 1` enriches it and leaves "zeta"
    // staged-only.
    let mut bare = record("zeta", "2025-02-03");
    bare.media_url = "unknown.example".to_string();
    let batch = vec![record("alpha", "2025-02-01"), bare];
    fetch::stage(&pool, &batch).await.unwrap();

    let fetcher =
        StubFetcher::default().with_text("https://example.com/alpha", "A badger was seen.");
    enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, Some(1))
        .await
        .unwrap();
    extract::extract_pending(&pool, &cfg.search.keywords)
        .await
        .unwrap();

    let count = materialize::materialize(&pool).await.unwrap();
    assert_eq!(count, 2);

    let (outlet, sentence): (String, String) = sqlx::query_as(
        "SELECT media_outlet, sentence FROM story WHERE id = 'alpha'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(outlet, "Example");
    assert_eq!(sentence, "A badger was seen.");

    // A story with no enrichment or sentence still appears exactly once,
    // with empty fields and the default outlet.
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT media_outlet, authors, sentence FROM story WHERE id = 'zeta'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], ("Unspecified".to_string(), String::new(), String::new()));

    // Recompute replaces, never appends.
    let count = materialize::materialize(&pool).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn export_round_trips_through_csv() {
    let (_tmp, cfg, pool) = setup().await;
    let batch = vec![record("a", "2025-02-01"), record("b", "2025-02-02")];
    fetch::stage(&pool, &batch).await.unwrap();

    let fetcher = StubFetcher::default()
        .with_text("https://example.com/a", "The badger story, \u{201C}quoted\u{201D}.")
        .with_text("https://example.com/b", "Another badger story.");
    enrich::enrich_pending(&pool, &cfg.enrich, &fetcher, None)
        .await
        .unwrap();
    extract::extract_pending(&pool, &cfg.search.keywords)
        .await
        .unwrap();
    materialize::materialize(&pool).await.unwrap();

    let stories = export::load_stories(&pool).await.unwrap();
    assert_eq!(stories.len(), 2);

    let reports = export::export_stories(
        &stories,
        &cfg.export,
        &[export::ExportFormat::Csv, export::ExportFormat::CsvGz],
    )
    .unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.bytes > 0));

    let csv_path: &PathBuf = &reports[0].path;
    let mut reader = csv::Reader::from_path(csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "publishDate"));
    assert!(headers.iter().any(|h| h == "mediaOutlet"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), stories.len());

    // Cell values survive the round trip, smart quotes already normalized.
    let id_index = headers.iter().position(|h| h == "id").unwrap();
    let sentence_index = headers.iter().position(|h| h == "sentence").unwrap();
    for story in &stories {
        let row = rows.iter().find(|r| &r[id_index] == story.id).unwrap();
        assert_eq!(&row[sentence_index], story.sentence);
    }
    let quoted = stories.iter().find(|s| s.id == "a").unwrap();
    assert_eq!(quoted.sentence, "The badger story, \"quoted\".");
}
