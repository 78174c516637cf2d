//! Article content extraction.
//!
//! Fetches a story URL and pulls structured fields out of the HTML: title,
//! body text, authors, publish date, lead image, and summary. Sources vary
//! wildly, so every field falls back through a chain of selectors (OpenGraph
//! meta tags first, then common markup conventions) and defaults to empty.
//!
//! The [`ArticleFetcher`] trait is the seam the enrichment loop depends on;
//! tests substitute a stub so no network is involved.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::EnrichConfig;
use crate::models::ArticleContent;

/// Classified per-article failure, recorded verbatim in the staging store.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("RequestError: {0}")]
    Request(String),
    #[error("StatusError: HTTP {0}")]
    Status(u16),
    #[error("BodyError: {0}")]
    Body(String),
}

/// Content-extraction capability: fetch a URL and parse its article fields.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch_and_parse(&self, url: &str) -> Result<ArticleContent, ArticleError>;
}

/// HTTP implementation backed by reqwest + scraper.
pub struct HttpArticleFetcher {
    client: reqwest::Client,
}

impl HttpArticleFetcher {
    pub fn new(config: &EnrichConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_and_parse(&self, url: &str) -> Result<ArticleContent, ArticleError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArticleError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArticleError::Status(status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ArticleError::Body(e.to_string()))?;

        Ok(parse_article(&html, url))
    }
}

fn sel(selector: &str) -> Selector {
    // Static selectors; parse cannot fail.
    Selector::parse(selector).unwrap()
}

/// Extract article fields from an HTML document.
///
/// Never fails: a page with none of the expected markup yields empty fields,
/// which the enrichment stage still records.
pub fn parse_article(html: &str, url: &str) -> ArticleContent {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let title = meta_content(&document, "meta[property=\"og:title\"]")
        .or_else(|| first_text(&document, "title"))
        .or_else(|| first_text(&document, "h1"))
        .unwrap_or_default();

    let text = body_text(&document);

    let publish_date = meta_content(&document, "meta[property=\"article:published_time\"]")
        .or_else(|| meta_content(&document, "meta[name=\"publish-date\"]"))
        .or_else(|| first_attr(&document, "time[datetime]", "datetime"))
        .or_else(|| first_text(&document, "time"))
        .and_then(|raw| parse_publish_date(&raw));

    let authors = meta_content(&document, "meta[name=\"author\"]")
        .or_else(|| all_text(&document, "a[rel=\"author\"]"))
        .or_else(|| first_text(&document, ".author, .byline, .author-name"))
        .unwrap_or_default();

    let top_image = meta_content(&document, "meta[property=\"og:image\"]")
        .map(|src| resolve(&base, &src))
        .unwrap_or_default();

    let summary = meta_content(&document, "meta[name=\"description\"]")
        .or_else(|| meta_content(&document, "meta[property=\"og:description\"]"))
        .unwrap_or_default();

    ArticleContent {
        title: title.trim().to_string(),
        text,
        publish_date,
        authors: authors.trim().to_string(),
        top_image,
        summary: summary.trim().to_string(),
    }
}

/// Paragraph text, preferring `<article>` content over the whole page.
fn body_text(document: &Html) -> String {
    let scoped = sel("article p");
    let mut paragraphs: Vec<String> = document
        .select(&scoped)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    if paragraphs.is_empty() {
        let any_p = sel("p");
        paragraphs = document
            .select(&any_p)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
    }

    paragraphs.join("\n\n")
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    first_attr(document, selector, "content")
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = sel(selector);
    document
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = sel(selector);
    document
        .select(&selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn all_text(document: &Html, selector: &str) -> Option<String> {
    let selector = sel(selector);
    let parts: Vec<String> = document
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn resolve(base: &Option<Url>, src: &str) -> String {
    match base {
        Some(base) => base
            .join(src)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| src.to_string()),
        None => src.to_string(),
    }
}

/// Parse the date formats seen in the wild, most specific first.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
