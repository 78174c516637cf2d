//! Core data models used throughout presswatch.
//!
//! These types represent the records that flow between pipeline stages.
//! Each stage consumes and produces one of them; nothing dict-shaped crosses
//! a stage boundary.

use chrono::{DateTime, Utc};

/// A story as returned by the search API, before staging.
///
/// Ephemeral: only survives a run by being written to `stage_story`.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Content fingerprint; the upstream id, or SHA-256 of the canonicalized URL.
    pub id: String,
    pub indexed_at: DateTime<Utc>,
    pub publish_date: Option<DateTime<Utc>>,
    pub title: String,
    pub url: String,
    pub language: String,
    pub media_name: String,
    pub media_url: String,
}

/// Structured article content produced by a successful fetch-and-parse.
#[derive(Debug, Clone, Default)]
pub struct ArticleContent {
    pub title: String,
    pub text: String,
    pub publish_date: Option<DateTime<Utc>>,
    pub authors: String,
    pub top_image: String,
    pub summary: String,
}

/// Per-story enrichment result. The write step consumes either variant, so a
/// row is recorded even when the fetch or parse fails.
#[derive(Debug, Clone)]
pub enum EnrichOutcome {
    Success(ArticleContent),
    Failure(String),
}

/// One row of the denormalized `story` view, recomputed at materialize time.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalStory {
    pub id: String,
    pub publish_date: Option<i64>,
    pub title: String,
    pub url: String,
    pub media_name: String,
    pub media_url: String,
    pub media_outlet: String,
    pub bias_rating: String,
    pub authors: String,
    pub image: String,
    pub summary: String,
    pub sentence: String,
}

/// Summary counts for a fetch + stage run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchReport {
    pub fetched: usize,
    pub inserted: u64,
    pub duplicates: usize,
}

/// Summary counts for an enrichment run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichReport {
    pub found: usize,
    pub succeeded: u64,
    pub failed: u64,
}
