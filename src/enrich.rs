//! Enrichment: visit each staged story and record its article content.
//!
//! "Pending" is an anti-join — staged stories with no enrichment row — which
//! makes the stage resumable for free: a killed run simply leaves fewer rows,
//! and the next run picks up the remainder. Every processed story gets
//! exactly one row, failures included, so nothing is retried forever.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::article::{ArticleFetcher, HttpArticleFetcher};
use crate::config::{Config, EnrichConfig};
use crate::db;
use crate::models::{ArticleContent, EnrichOutcome, EnrichReport};

/// CLI entry: enrich pending stories, printing a summary.
pub async fn run_enrich(config: &Config, limit: Option<usize>) -> Result<EnrichReport> {
    let fetcher = HttpArticleFetcher::new(&config.enrich)?;
    let pool = db::connect(config).await?;

    let result = enrich_pending(&pool, &config.enrich, &fetcher, limit).await;
    pool.close().await;
    let report = result?;

    println!("enrich");
    println!("  pending stories: {}", report.found);
    println!("  succeeded: {}", report.succeeded);
    println!("  failed: {}", report.failed);
    println!("ok");

    Ok(report)
}

/// Process every staged story that has no enrichment row yet.
pub async fn enrich_pending(
    pool: &SqlitePool,
    config: &EnrichConfig,
    fetcher: &dyn ArticleFetcher,
    limit: Option<usize>,
) -> Result<EnrichReport> {
    let pending: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT s.id, s.url
        FROM stage_story s
        WHERE s.id NOT IN (SELECT e.story_id FROM stage_enrichment e)
        ORDER BY s.indexed_at, s.id
        LIMIT ?
        "#,
    )
    .bind(limit.map(|l| l as i64).unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    let total = pending.len();
    info!(total, "stories pending enrichment");

    let mut report = EnrichReport {
        found: total,
        ..Default::default()
    };

    for (index, (story_id, url)) in pending.iter().enumerate() {
        let outcome = match fetcher.fetch_and_parse(url).await {
            Ok(article) => EnrichOutcome::Success(article),
            Err(e) => EnrichOutcome::Failure(e.to_string()),
        };

        let succeeded = matches!(outcome, EnrichOutcome::Success(_));
        match write_enrichment(pool, story_id, &outcome).await {
            Ok(()) => {
                if succeeded {
                    report.succeeded += 1;
                } else {
                    warn!(%story_id, %url, "enrichment failed, recorded as data");
                    report.failed += 1;
                }
            }
            Err(e) => {
                // Record the write failure itself; a second failure is
                // fatal for this item only.
                warn!(%story_id, error = %e, "enrichment row write failed");
                let fallback = EnrichOutcome::Failure(format!("InsertError: {}", e));
                if let Err(e2) = write_enrichment(pool, story_id, &fallback).await {
                    error!(%story_id, error = %e2, "could not record enrichment failure");
                }
                report.failed += 1;
            }
        }

        let processed = (index + 1) as u64;
        if processed % config.checkpoint_every == 0 {
            db::checkpoint(pool).await?;
            info!(
                processed,
                total,
                succeeded = report.succeeded,
                "enrichment progress, checkpointed"
            );
        }

        // Politeness throttle between article requests.
        if config.request_delay_ms > 0 && index + 1 < total {
            tokio::time::sleep(Duration::from_millis(config.request_delay_ms)).await;
        }
    }

    Ok(report)
}

/// Upsert the single enrichment row for a story, from either outcome variant.
async fn write_enrichment(
    pool: &SqlitePool,
    story_id: &str,
    outcome: &EnrichOutcome,
) -> Result<(), sqlx::Error> {
    let empty = ArticleContent::default();
    let (article, success, error): (&ArticleContent, bool, Option<&str>) = match outcome {
        EnrichOutcome::Success(article) => (article, true, None),
        EnrichOutcome::Failure(reason) => (&empty, false, Some(reason.as_str())),
    };

    sqlx::query(
        r#"
        INSERT INTO stage_enrichment
            (story_id, imported_at, title, text, publish_date, authors,
             top_image, summary, success, error)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(story_id) DO UPDATE SET
            imported_at = excluded.imported_at,
            title = excluded.title,
            text = excluded.text,
            publish_date = excluded.publish_date,
            authors = excluded.authors,
            top_image = excluded.top_image,
            summary = excluded.summary,
            success = excluded.success,
            error = excluded.error
        "#,
    )
    .bind(story_id)
    .bind(Utc::now().timestamp())
    .bind(&article.title)
    .bind(&article.text)
    .bind(article.publish_date.map(|d| d.timestamp()))
    .bind(&article.authors)
    .bind(&article.top_image)
    .bind(&article.summary)
    .bind(success)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}
