//! # presswatch CLI (`pw`)
//!
//! The `pw` binary drives the ingestion pipeline. Each stage is its own
//! subcommand so stages can be re-run independently; `pw run` executes them
//! all in dependency order.
//!
//! ## Usage
//!
//! ```bash
//! pw --config ./config/presswatch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pw init` | Create the SQLite database and run schema migrations |
//! | `pw load-outlets <csv>` | Replace the media-outlet dimension from a CSV |
//! | `pw fetch` | Pull new stories from the search API and stage them |
//! | `pw enrich` | Scrape article content for stories without enrichment |
//! | `pw extract` | Find the longest keyword sentence per enriched story |
//! | `pw materialize` | Rebuild the canonical denormalized view |
//! | `pw export` | Write the canonical view as CSV / Parquet / compressed |
//! | `pw run` | All pipeline stages, in order |
//! | `pw stats` | Staging store counts and health overview |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! pw init --config ./config/presswatch.toml
//!
//! # Incremental daily run
//! pw run --config ./config/presswatch.toml
//!
//! # Re-fetch a specific window
//! pw fetch --since 2025-10-01 --until 2025-10-07
//!
//! # Enrich a bounded batch (useful while tuning the politeness delay)
//! pw enrich --limit 50
//!
//! # Export only the parquet snapshot
//! pw export --format parquet
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use presswatch::{config, enrich, export, extract, fetch, materialize, migrate, outlets, stats};

/// presswatch — an incremental news-mention tracking pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/presswatch.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pw",
    about = "presswatch — incremental news-mention tracking pipeline",
    version,
    long_about = "presswatch collects news stories mentioning configured keywords through a \
    staged pipeline (fetch, enrich, extract, materialize, export) over a SQLite staging store. \
    Every stage is idempotent and resumable: interrupted runs pick up exactly where they left off."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/presswatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all staging tables. Idempotent —
    /// running it multiple times is safe.
    Init,

    /// Replace the media-outlet dimension from a CSV file.
    ///
    /// Expected columns: `media_url,name,bias_rating`.
    LoadOutlets {
        /// Path to the outlets CSV.
        path: PathBuf,
    },

    /// Fetch new stories from the search API and stage the unseen ones.
    ///
    /// The window starts at the staged watermark (or the configured start
    /// date on first run) and ends today, unless overridden.
    Fetch {
        /// Override the window start (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Override the window end (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
    },

    /// Scrape article content for staged stories without an enrichment row.
    ///
    /// Failures are recorded as data (success = false) so no story is
    /// retried forever. Interrupting is safe; the next run resumes.
    Enrich {
        /// Maximum number of stories to process this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Extract the longest keyword-matching sentence per enriched story.
    Extract,

    /// Rebuild the canonical denormalized view from the staging tables.
    Materialize,

    /// Export the canonical view.
    ///
    /// Formats default to the configured list; repeat `--format` to
    /// override (csv, parquet, csv.gz, csv.zst).
    Export {
        /// Output format, repeatable.
        #[arg(long = "format")]
        formats: Vec<String>,
    },

    /// Run all pipeline stages in dependency order.
    Run,

    /// Show staging store counts and health overview.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::LoadOutlets { path } => {
            outlets::run_load_outlets(&cfg, &path).await?;
        }
        Commands::Fetch { since, until } => {
            fetch::run_fetch(&cfg, since, until).await?;
        }
        Commands::Enrich { limit } => {
            enrich::run_enrich(&cfg, limit).await?;
        }
        Commands::Extract => {
            extract::run_extract(&cfg).await?;
        }
        Commands::Materialize => {
            materialize::run_materialize(&cfg).await?;
        }
        Commands::Export { formats } => {
            export::run_export(&cfg, formats).await?;
        }
        Commands::Run => {
            migrate::run_migrations(&cfg).await?;
            let fetched = fetch::run_fetch(&cfg, None, None).await?;
            let enriched = enrich::run_enrich(&cfg, None).await?;
            let extracted = extract::run_extract(&cfg).await?;
            let materialized = materialize::run_materialize(&cfg).await?;
            export::run_export(&cfg, Vec::new()).await?;

            println!();
            println!("run complete");
            println!("  new stories: {}", fetched.inserted);
            println!(
                "  enriched: {} ok / {} failed",
                enriched.succeeded, enriched.failed
            );
            println!("  sentences extracted: {}", extracted);
            println!("  canonical stories: {}", materialized);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
