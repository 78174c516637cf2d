//! Canonical view export.
//!
//! Reads the `story` table and writes it out in the requested formats:
//! plain CSV, Parquet, and gzip/zstd-compressed variants of the CSV bytes.
//! Column names are converted to camelCase on the way out so the external
//! contract is decoupled from the internal snake_case schema. Each file's
//! size is reported along with its compression ratio against the plain CSV.

use anyhow::{Context, Result};
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use chrono::DateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use parquet::arrow::ArrowWriter;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{Config, ExportConfig};
use crate::db;
use crate::models::CanonicalStory;

/// Internal column order; export headers are the camelCase of these.
const COLUMNS: [&str; 12] = [
    "id",
    "publish_date",
    "title",
    "url",
    "media_name",
    "media_url",
    "media_outlet",
    "bias_rating",
    "authors",
    "image",
    "summary",
    "sentence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
    CsvGz,
    CsvZst,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
            ExportFormat::CsvGz => "csv.gz",
            ExportFormat::CsvZst => "csv.zst",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" => Ok(ExportFormat::Parquet),
            "csv.gz" => Ok(ExportFormat::CsvGz),
            "csv.zst" => Ok(ExportFormat::CsvZst),
            other => anyhow::bail!(
                "Unknown export format: '{}'. Must be csv, parquet, csv.gz, or csv.zst.",
                other
            ),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Size metrics for one written file.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub bytes: u64,
    /// Plain-CSV bytes divided by this file's bytes.
    pub ratio: f64,
}

/// CLI entry: export the canonical view, printing per-format sizes.
///
/// `formats` overrides the configured list when non-empty.
pub async fn run_export(config: &Config, formats: Vec<String>) -> Result<Vec<ExportReport>> {
    let names = if formats.is_empty() {
        config.export.formats.clone()
    } else {
        formats
    };
    let formats: Vec<ExportFormat> = names
        .iter()
        .map(|name| name.parse())
        .collect::<Result<_>>()?;

    let pool = db::connect(config).await?;
    let result = load_stories(&pool).await;
    pool.close().await;
    let stories = result?;

    let reports = export_stories(&stories, &config.export, &formats)?;

    println!("export");
    println!("  stories: {}", stories.len());
    for report in &reports {
        println!(
            "  {}: {} bytes ({:.1}x vs csv)",
            report.path.display(),
            report.bytes,
            report.ratio
        );
    }
    println!("ok");

    Ok(reports)
}

/// Read the canonical view, newest first.
pub async fn load_stories(pool: &SqlitePool) -> Result<Vec<CanonicalStory>> {
    let rows = sqlx::query(
        "SELECT id, publish_date, title, url, media_name, media_url, \
                media_outlet, bias_rating, authors, image, summary, sentence \
         FROM story ORDER BY publish_date DESC, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| CanonicalStory {
            id: row.get("id"),
            publish_date: row.get("publish_date"),
            title: row.get("title"),
            url: row.get("url"),
            media_name: row.get("media_name"),
            media_url: row.get("media_url"),
            media_outlet: row.get("media_outlet"),
            bias_rating: row.get("bias_rating"),
            authors: row.get("authors"),
            image: row.get("image"),
            summary: row.get("summary"),
            sentence: row.get("sentence"),
        })
        .collect())
}

/// Write the requested formats and report each file's size.
pub fn export_stories(
    stories: &[CanonicalStory],
    config: &ExportConfig,
    formats: &[ExportFormat],
) -> Result<Vec<ExportReport>> {
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;

    let csv = csv_bytes(stories)?;
    let mut reports = Vec::with_capacity(formats.len());

    for format in formats {
        let path = config
            .out_dir
            .join(format!("{}.{}", config.file_stem, format.extension()));

        match format {
            ExportFormat::Csv => {
                std::fs::write(&path, &csv)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            ExportFormat::Parquet => {
                write_parquet(&path, stories)?;
            }
            ExportFormat::CsvGz => {
                let file =
                    File::create(&path).with_context(|| format!("creating {}", path.display()))?;
                let mut encoder = GzEncoder::new(file, Compression::default());
                encoder.write_all(&csv)?;
                encoder
                    .finish()
                    .with_context(|| format!("finishing {}", path.display()))?;
            }
            ExportFormat::CsvZst => {
                let compressed = zstd::encode_all(&csv[..], 0)
                    .with_context(|| format!("compressing {}", path.display()))?;
                std::fs::write(&path, compressed)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
        }

        let bytes = std::fs::metadata(&path)?.len();
        let ratio = if bytes > 0 {
            csv.len() as f64 / bytes as f64
        } else {
            0.0
        };
        reports.push(ExportReport {
            format: *format,
            path,
            bytes,
            ratio,
        });
    }

    Ok(reports)
}

/// Serialize stories as CSV with camelCase headers.
pub fn csv_bytes(stories: &[CanonicalStory]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(COLUMNS.iter().map(|c| to_camel_case(c)))?;
    for story in stories {
        let publish_date = format_publish_date(story.publish_date);
        writer.write_record([
            story.id.as_str(),
            publish_date.as_str(),
            story.title.as_str(),
            story.url.as_str(),
            story.media_name.as_str(),
            story.media_url.as_str(),
            story.media_outlet.as_str(),
            story.bias_rating.as_str(),
            story.authors.as_str(),
            story.image.as_str(),
            story.summary.as_str(),
            story.sentence.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv writer: {}", e))
}

fn write_parquet(path: &Path, stories: &[CanonicalStory]) -> Result<()> {
    let fields: Vec<Field> = COLUMNS
        .iter()
        .map(|c| Field::new(to_camel_case(c), DataType::Utf8, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let dates: Vec<String> = stories
        .iter()
        .map(|s| format_publish_date(s.publish_date))
        .collect();

    let columns: Vec<ArrayRef> = vec![
        string_column(stories.iter().map(|s| s.id.as_str())),
        string_column(dates.iter().map(String::as_str)),
        string_column(stories.iter().map(|s| s.title.as_str())),
        string_column(stories.iter().map(|s| s.url.as_str())),
        string_column(stories.iter().map(|s| s.media_name.as_str())),
        string_column(stories.iter().map(|s| s.media_url.as_str())),
        string_column(stories.iter().map(|s| s.media_outlet.as_str())),
        string_column(stories.iter().map(|s| s.bias_rating.as_str())),
        string_column(stories.iter().map(|s| s.authors.as_str())),
        string_column(stories.iter().map(|s| s.image.as_str())),
        string_column(stories.iter().map(|s| s.summary.as_str())),
        string_column(stories.iter().map(|s| s.sentence.as_str())),
    ];

    let batch =
        RecordBatch::try_new(schema, columns).context("building story record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

/// Seconds-since-epoch to `YYYY-MM-DD HH:MM:SS`, empty when unknown.
fn format_publish_date(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn to_camel_case(snake: &str) -> String {
    let mut parts = snake.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
