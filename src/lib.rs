//! # presswatch
//!
//! An incremental news-mention tracker: a staged, crash-recoverable pipeline
//! that collects stories mentioning configured keywords, enriches each with
//! scraped article content, extracts the most relevant sentence, and
//! republishes a denormalized export for downstream consumers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌───────────┐
//! │ Fetcher  │──▶│ Enricher  │──▶│ Extractor│──▶│Materialize│
//! │ search + │   │ article   │   │ sentence │   │ + Export  │
//! │ dedup    │   │ scraping  │   │ matching │   │ csv/parquet│
//! └────┬─────┘   └────┬──────┘   └────┬─────┘   └────┬──────┘
//!      └──────────────┴── SQLite staging store ──────┘
//! ```
//!
//! Each stage consumes the durable output of its predecessor and finds its
//! own work via "pending" anti-join queries, so any stage can be re-run or
//! killed mid-item and resume cleanly on the next invocation.
//!
//! ## Quick Start
//!
//! ```bash
//! pw init                       # create database
//! pw load-outlets outlets.csv   # load the media-outlet dimension
//! pw fetch                      # pull new stories since the watermark
//! pw enrich                     # scrape article content
//! pw extract                    # find keyword sentences
//! pw materialize                # rebuild the canonical view
//! pw export                     # write csv / parquet
//! pw run                        # all of the above, in order
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Typed stage records |
//! | [`search_api`] | Paginated keyword-search capability |
//! | [`fetch`] | Fetch + dedup/stage stage |
//! | [`article`] | Article fetch-and-parse capability |
//! | [`enrich`] | Enrichment stage |
//! | [`sentence`] | Sentence tokenization and match selection |
//! | [`extract`] | Sentence extraction stage |
//! | [`materialize`] | Canonical view recompute |
//! | [`export`] | CSV / Parquet / compressed export |
//! | [`db`] | Database connection and checkpointing |
//! | [`migrate`] | Schema migrations |

pub mod article;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod materialize;
pub mod migrate;
pub mod models;
pub mod outlets;
pub mod search_api;
pub mod sentence;
pub mod stats;
