use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Keywords OR-ed (quoted) into the search query. The same list drives
    /// the sentence extractor's match predicate.
    pub keywords: Vec<String>,

    /// Collection ids the search is scoped to. Empty means unscoped.
    #[serde(default)]
    pub collections: Vec<i64>,

    /// Earliest publish date ever requested (YYYY-MM-DD). The watermark can
    /// only move the window forward from here.
    pub start_date: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://search.mediacloud.org/api".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichConfig {
    /// Politeness delay between article requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Force a WAL checkpoint every this many processed stories.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            checkpoint_every: default_checkpoint_every(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    2000
}
fn default_checkpoint_every() -> u64 {
    100
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0 Safari/537.36"
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory export files are written into.
    pub out_dir: PathBuf,

    /// File name without extension; formats append `.csv`, `.parquet`, etc.
    #[serde(default = "default_file_stem")]
    pub file_stem: String,

    /// Formats written when `pw export` is run without `--format` flags.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_file_stem() -> String {
    "stories".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["csv".to_string(), "parquet".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate search
    if config.search.keywords.is_empty() {
        anyhow::bail!("search.keywords must list at least one keyword");
    }
    if config.search.keywords.iter().any(|k| k.trim().is_empty()) {
        anyhow::bail!("search.keywords must not contain empty entries");
    }
    NaiveDate::parse_from_str(&config.search.start_date, "%Y-%m-%d")
        .with_context(|| "search.start_date must be YYYY-MM-DD")?;

    // Validate enrich
    if config.enrich.checkpoint_every == 0 {
        anyhow::bail!("enrich.checkpoint_every must be > 0");
    }

    // Validate export
    for format in &config.export.formats {
        match format.as_str() {
            "csv" | "parquet" | "csv.gz" | "csv.zst" => {}
            other => anyhow::bail!(
                "Unknown export format: '{}'. Must be csv, parquet, csv.gz, or csv.zst.",
                other
            ),
        }
    }

    Ok(config)
}

impl SearchConfig {
    /// The configured floor for the fetch window.
    pub fn start_date(&self) -> NaiveDate {
        // Validated in load_config.
        NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").unwrap_or_default()
    }

    /// Query string sent to the search API: keywords quoted and OR-ed,
    /// e.g. `"opensecrets" OR "open secrets"`.
    pub fn query(&self) -> String {
        self.keywords
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("presswatch.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[db]
path = "data/presswatch.sqlite"

[search]
keywords = ["opensecrets"]
start_date = "2025-09-26"

[export]
out_dir = "web/data"
"#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.enrich.request_delay_ms, 2000);
        assert_eq!(cfg.enrich.checkpoint_every, 100);
        assert_eq!(cfg.export.formats, vec!["csv", "parquet"]);
        assert_eq!(cfg.export.file_stem, "stories");
        assert_eq!(cfg.search.start_date(), NaiveDate::from_ymd_opt(2025, 9, 26).unwrap());
    }

    #[test]
    fn query_quotes_and_ors_keywords() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            &MINIMAL.replace(
                r#"keywords = ["opensecrets"]"#,
                r#"keywords = ["opensecrets", "open secrets"]"#,
            ),
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.search.query(), r#""opensecrets" OR "open secrets""#);
    }

    #[test]
    fn rejects_empty_keywords() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), &MINIMAL.replace(r#"["opensecrets"]"#, "[]"));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_bad_start_date() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), &MINIMAL.replace("2025-09-26", "9/26/2025"));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_unknown_export_format() {
        let tmp = tempfile::tempdir().unwrap();
        let body = format!("{}formats = [\"xlsx\"]\n", MINIMAL);
        let path = write_config(tmp.path(), &body);
        assert!(load_config(&path).is_err());
    }
}
