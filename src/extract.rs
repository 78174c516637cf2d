//! Sentence extraction: scan enriched text for the best keyword mention.
//!
//! Selects enrichment rows with non-empty text and no sentence row yet (the
//! same anti-join resumption pattern as enrichment), stores the longest
//! matching sentence per story, and writes an empty placeholder when nothing
//! matches so the story is never re-scanned.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::sentence::longest_matching_sentence;

/// CLI entry: extract sentences for pending stories, printing a summary.
pub async fn run_extract(config: &Config) -> Result<u64> {
    let pool = db::connect(config).await?;

    let result = extract_pending(&pool, &config.search.keywords).await;
    pool.close().await;
    let processed = result?;

    println!("extract");
    println!("  stories processed: {}", processed);
    println!("ok");

    Ok(processed)
}

/// Process every enriched story with text that has no sentence row yet.
pub async fn extract_pending(pool: &SqlitePool, keywords: &[String]) -> Result<u64> {
    let pending: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT e.story_id, e.text
        FROM stage_enrichment e
        WHERE e.text <> ''
          AND e.story_id NOT IN (SELECT sn.story_id FROM stage_sentence sn)
        ORDER BY e.imported_at, e.story_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let total = pending.len();
    info!(total, "stories pending sentence extraction");

    let mut processed = 0u64;
    for (story_id, text) in &pending {
        let sentence = longest_matching_sentence(text, keywords);

        sqlx::query(
            r#"
            INSERT INTO stage_sentence (story_id, extracted_at, sentence)
            VALUES (?, ?, ?)
            ON CONFLICT(story_id) DO UPDATE SET
                extracted_at = excluded.extracted_at,
                sentence = excluded.sentence
            "#,
        )
        .bind(story_id)
        .bind(Utc::now().timestamp())
        .bind(&sentence)
        .execute(pool)
        .await?;

        processed += 1;
        if processed % 100 == 0 {
            db::checkpoint(pool).await?;
            info!(processed, total, "extraction progress, checkpointed");
        }
    }

    Ok(processed)
}
