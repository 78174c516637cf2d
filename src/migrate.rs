use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Staged stories: append-only by content fingerprint, immutable once written.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stage_story (
            id TEXT PRIMARY KEY,
            indexed_at INTEGER NOT NULL,
            language TEXT NOT NULL DEFAULT 'en',
            media_name TEXT NOT NULL DEFAULT '',
            media_url TEXT NOT NULL DEFAULT '',
            publish_date INTEGER,
            title TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Enrichment results: at most one live row per story (PRIMARY KEY), writes
    // are upserts. Failures are rows too (success = 0, error populated).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stage_enrichment (
            story_id TEXT PRIMARY KEY,
            imported_at INTEGER NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            text TEXT NOT NULL DEFAULT '',
            publish_date INTEGER,
            authors TEXT NOT NULL DEFAULT '',
            top_image TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL DEFAULT '',
            success INTEGER NOT NULL,
            error TEXT,
            FOREIGN KEY (story_id) REFERENCES stage_story(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Extracted sentences: at most one row per story; sentence may be empty.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stage_sentence (
            story_id TEXT PRIMARY KEY,
            extracted_at INTEGER NOT NULL,
            sentence TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (story_id) REFERENCES stage_story(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Static media-outlet dimension, loaded from CSV via `pw load-outlets`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_outlet (
            media_url TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            bias_rating TEXT NOT NULL DEFAULT 'Unspecified'
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Canonical denormalized view, fully recomputed by `pw materialize`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS story (
            id TEXT PRIMARY KEY,
            publish_date INTEGER,
            title TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT '',
            media_name TEXT NOT NULL DEFAULT '',
            media_url TEXT NOT NULL DEFAULT '',
            media_outlet TEXT NOT NULL DEFAULT 'Unspecified',
            bias_rating TEXT NOT NULL DEFAULT 'Unspecified',
            authors TEXT NOT NULL DEFAULT '',
            image TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL DEFAULT '',
            sentence TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stage_story_publish_date ON stage_story(publish_date DESC)",
    )
    .execute(&pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stage_story_media_url ON stage_story(media_url)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
