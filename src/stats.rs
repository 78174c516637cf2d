//! Staging store statistics and health overview.
//!
//! Provides a quick summary of pipeline progress: how many stories are
//! staged, enriched, and sentence-scanned, the enrichment success rate, and
//! the size of the canonical view. Used by `pw stats` to give confidence
//! that runs are moving the pipeline forward.

use anyhow::Result;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let staged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stage_story")
        .fetch_one(&pool)
        .await?;
    let enriched: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stage_enrichment")
        .fetch_one(&pool)
        .await?;
    let enriched_ok: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM stage_enrichment WHERE success = 1")
            .fetch_one(&pool)
            .await?;
    let sentences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stage_sentence")
        .fetch_one(&pool)
        .await?;
    let matched: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM stage_sentence WHERE sentence <> ''")
            .fetch_one(&pool)
            .await?;
    let outlets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_outlet")
        .fetch_one(&pool)
        .await?;
    let canonical: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("presswatch — Staging Store Stats");
    println!("================================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!();
    println!("  Staged stories: {}", staged);
    println!(
        "  Enriched:       {} / {} ({}% success)",
        enriched,
        staged,
        if enriched > 0 {
            (enriched_ok * 100) / enriched
        } else {
            0
        }
    );
    println!(
        "  Sentences:      {} scanned, {} with a match",
        sentences, matched
    );
    println!("  Outlets:        {}", outlets);
    println!("  Canonical view: {}", canonical);
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
