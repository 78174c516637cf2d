//! Fetch + stage: pull new stories from the search source and append the
//! unseen ones to `stage_story`.
//!
//! All pages are accumulated before anything is written, so an interrupted
//! fetch commits nothing and a retry starts clean. Deduplication loads the
//! full existing id set into memory and bulk-inserts the remainder inside a
//! single transaction; inserting zero rows is a normal outcome.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::db;
use crate::error::PipelineError;
use crate::models::{FetchReport, SourceRecord};
use crate::search_api::{HttpSearchProvider, SearchProvider};

/// CLI entry: fetch new stories and stage them, printing a summary.
pub async fn run_fetch(
    config: &Config,
    since: Option<String>,
    until: Option<String>,
) -> Result<FetchReport> {
    let provider = HttpSearchProvider::new(&config.search)?;
    let pool = db::connect(config).await?;

    let result = fetch_and_stage(&pool, config, &provider, since, until).await;
    pool.close().await;
    let report = result?;

    println!("fetch");
    println!("  stories found: {}", report.fetched);
    println!("  newly staged: {}", report.inserted);
    println!("  skipped as duplicate: {}", report.duplicates);
    println!("ok");

    Ok(report)
}

/// Fetch the full window and stage whatever is new.
pub async fn fetch_and_stage(
    pool: &SqlitePool,
    config: &Config,
    provider: &dyn SearchProvider,
    since: Option<String>,
    until: Option<String>,
) -> Result<FetchReport> {
    let start = match since {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")?,
        None => fetch_window_start(pool, config).await?,
    };
    let end = match until {
        Some(u) => NaiveDate::parse_from_str(&u, "%Y-%m-%d")?,
        None => Utc::now().date_naive(),
    };

    info!(%start, %end, "fetching stories");

    let records = fetch_all(provider, &config.search.query(), start, end, &config.search.collections).await?;
    let fetched = records.len();
    let inserted = stage(pool, &records).await?;

    Ok(FetchReport {
        fetched,
        inserted,
        duplicates: fetched - inserted as usize,
    })
}

/// Where the next fetch window starts: the watermark date when it is past
/// the configured floor, otherwise the floor itself.
pub async fn fetch_window_start(pool: &SqlitePool, config: &Config) -> Result<NaiveDate> {
    let floor = config.search.start_date();
    Ok(match watermark(pool).await? {
        Some(mark) if mark.date_naive() > floor => mark.date_naive(),
        _ => floor,
    })
}

/// The maximum publish date already staged. Computed freshly each run,
/// never cached.
pub async fn watermark(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(publish_date) FROM stage_story")
        .fetch_one(pool)
        .await?;
    Ok(max.and_then(|ts| DateTime::from_timestamp(ts, 0)))
}

/// Page through the search source until it signals no continuation,
/// accumulating everything into one batch.
pub async fn fetch_all(
    provider: &dyn SearchProvider,
    query: &str,
    start: NaiveDate,
    end: NaiveDate,
    collections: &[i64],
) -> Result<Vec<SourceRecord>, PipelineError> {
    let mut records = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let (page, next_token) = provider
            .search_page(query, start, end, collections, page_token.as_deref())
            .await?;
        records.extend(page);

        match next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(records)
}

/// Append records whose id is not yet staged; returns the inserted count.
pub async fn stage(pool: &SqlitePool, records: &[SourceRecord]) -> Result<u64> {
    let existing: HashSet<String> = sqlx::query_scalar("SELECT id FROM stage_story")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    // Batches can repeat an id (syndicated stories); keep first occurrence.
    let mut seen = existing;
    let fresh: Vec<&SourceRecord> = records
        .iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();

    if fresh.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for record in &fresh {
        sqlx::query(
            r#"
            INSERT INTO stage_story
                (id, indexed_at, language, media_name, media_url, publish_date, title, url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.indexed_at.timestamp())
        .bind(&record.language)
        .bind(&record.media_name)
        .bind(&record.media_url)
        .bind(record.publish_date.map(|d| d.timestamp()))
        .bind(&record.title)
        .bind(&record.url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(fresh.len() as u64)
}

/// Content fingerprint for a story: SHA-256 of the canonicalized URL
/// (fragment dropped, trailing slash trimmed).
pub fn story_id_for_url(url: &str) -> String {
    let canonical = match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    };
    let canonical = canonical.trim_end_matches('/');

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_id_is_deterministic() {
        let a = story_id_for_url("https://example.com/news/2025/story");
        let b = story_id_for_url("https://example.com/news/2025/story");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_story_id_ignores_trailing_slash_and_fragment() {
        let base = story_id_for_url("https://example.com/news/2025/story");
        assert_eq!(base, story_id_for_url("https://example.com/news/2025/story/"));
        assert_eq!(
            base,
            story_id_for_url("https://example.com/news/2025/story#section")
        );
    }

    #[test]
    fn test_story_id_distinguishes_paths() {
        assert_ne!(
            story_id_for_url("https://example.com/a"),
            story_id_for_url("https://example.com/b")
        );
    }
}
