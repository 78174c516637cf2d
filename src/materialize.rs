//! Canonical view recompute.
//!
//! `story` is a pure function of the staging tables: each run deletes the
//! prior contents and repopulates it from the four-way outer join inside one
//! transaction. A story missing enrichment, sentence, or outlet data still
//! appears, with empty fields; a failed recompute rolls back and leaves the
//! prior view untouched.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::PipelineError;

/// CLI entry: rebuild the canonical view, printing the row count.
pub async fn run_materialize(config: &Config) -> Result<u64> {
    let pool = db::connect(config).await?;

    let result = materialize(&pool).await;
    pool.close().await;
    let count = result?;

    println!("materialize");
    println!("  stories in canonical view: {}", count);
    println!("ok");

    Ok(count)
}

/// Replace the `story` table wholesale from the staging tables.
pub async fn materialize(pool: &SqlitePool) -> Result<u64, PipelineError> {
    let mut tx = pool.begin().await.map_err(PipelineError::Materialize)?;

    sqlx::query("DELETE FROM story")
        .execute(&mut *tx)
        .await
        .map_err(PipelineError::Materialize)?;

    sqlx::query(
        r#"
        INSERT INTO story
            (id, publish_date, title, url, media_name, media_url,
             media_outlet, bias_rating, authors, image, summary, sentence)
        SELECT
            s.id,
            COALESCE(e.publish_date, s.publish_date),
            COALESCE(NULLIF(e.title, ''), s.title),
            s.url,
            s.media_name,
            s.media_url,
            COALESCE(m.name, 'Unspecified'),
            COALESCE(m.bias_rating, 'Unspecified'),
            COALESCE(e.authors, ''),
            COALESCE(e.top_image, ''),
            COALESCE(e.summary, ''),
            COALESCE(sn.sentence, '')
        FROM stage_story s
        LEFT JOIN stage_enrichment e ON e.story_id = s.id
        LEFT JOIN stage_sentence sn ON sn.story_id = s.id
        LEFT JOIN media_outlet m ON m.media_url = s.media_url
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(PipelineError::Materialize)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story")
        .fetch_one(&mut *tx)
        .await
        .map_err(PipelineError::Materialize)?;

    tx.commit().await.map_err(PipelineError::Materialize)?;

    Ok(count as u64)
}
