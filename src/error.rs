//! Pipeline error taxonomy.
//!
//! Only stage-fatal conditions are errors. Per-item enrichment failures are
//! recorded as data (`success = false` rows) and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The search source was unreachable or returned a malformed response.
    /// Fatal to the fetch run; nothing is staged.
    #[error("search fetch failed: {0}")]
    Fetch(String),

    /// The canonical view recompute failed. The transaction rolls back, so
    /// the prior view is left untouched.
    #[error("materialization failed: {0}")]
    Materialize(#[source] sqlx::Error),
}
