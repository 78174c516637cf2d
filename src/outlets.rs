//! Media-outlet dimension loader.
//!
//! Replaces the `media_outlet` table wholesale from a CSV file with
//! `media_url,name,bias_rating` columns. The dimension is static reference
//! data; reloading is the only way it changes.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;

use crate::config::Config;
use crate::db;

#[derive(Debug, Deserialize)]
struct OutletRow {
    media_url: String,
    name: String,
    #[serde(default)]
    bias_rating: Option<String>,
}

/// CLI entry: reload the outlet dimension, printing the row count.
pub async fn run_load_outlets(config: &Config, csv_path: &Path) -> Result<u64> {
    let pool = db::connect(config).await?;

    let result = load_outlets(&pool, csv_path).await;
    pool.close().await;
    let loaded = result?;

    println!("load-outlets");
    println!("  outlets loaded: {}", loaded);
    println!("ok");

    Ok(loaded)
}

/// Replace the dimension contents from the CSV in one transaction.
pub async fn load_outlets(pool: &SqlitePool, csv_path: &Path) -> Result<u64> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("reading {}", csv_path.display()))?;

    let rows: Vec<OutletRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("parsing {}", csv_path.display()))?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM media_outlet").execute(&mut *tx).await?;
    for row in &rows {
        sqlx::query(
            "INSERT INTO media_outlet (media_url, name, bias_rating) VALUES (?, ?, ?) \
             ON CONFLICT(media_url) DO UPDATE SET \
                 name = excluded.name, bias_rating = excluded.bias_rating",
        )
        .bind(&row.media_url)
        .bind(&row.name)
        .bind(row.bias_rating.as_deref().unwrap_or("Unspecified"))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(rows.len() as u64)
}
