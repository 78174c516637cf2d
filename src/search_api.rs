//! Keyword-search capability over the story index.
//!
//! The [`SearchProvider`] trait is the only surface the fetch stage sees:
//! one page of stories plus an opaque continuation token. The HTTP
//! implementation targets a Media-Cloud-style story-list endpoint:
//!
//! ```text
//! GET {api_base}/search/story-list
//!     ?q=<query>&start_date=YYYY-MM-DD&end_date=YYYY-MM-DD
//!     &collection_ids=1,2,3&pagination_token=<token>
//! Authorization: Token <SEARCH_API_TOKEN>
//! ```
//!
//! responding with `{ "stories": [...], "pagination_token": "..." | null }`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::article::parse_publish_date;
use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::fetch::story_id_for_url;
use crate::models::SourceRecord;

/// Environment variable holding the search API token.
pub const TOKEN_ENV: &str = "SEARCH_API_TOKEN";

/// One page of search results and the token for the next page, if any.
pub type SearchPage = (Vec<SourceRecord>, Option<String>);

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search_page(
        &self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        collections: &[i64],
        page_token: Option<&str>,
    ) -> Result<SearchPage, PipelineError>;
}

/// HTTP search client. The token is read from [`TOKEN_ENV`] (dotenv-aware).
pub struct HttpSearchProvider {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl HttpSearchProvider {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| anyhow::anyhow!("{} must be set (see .env)", TOKEN_ENV))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StoryListResponse {
    #[serde(default)]
    stories: Vec<ApiStory>,
    #[serde(default)]
    pagination_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStory {
    #[serde(default)]
    id: Option<String>,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    media_name: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
}

impl ApiStory {
    fn into_record(self) -> SourceRecord {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => story_id_for_url(&self.url),
        };
        SourceRecord {
            id,
            indexed_at: Utc::now(),
            publish_date: self.publish_date.as_deref().and_then(parse_publish_date),
            title: self.title.unwrap_or_default(),
            url: self.url,
            language: self.language.unwrap_or_else(|| "en".to_string()),
            media_name: self.media_name.unwrap_or_default(),
            media_url: self.media_url.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search_page(
        &self,
        query: &str,
        start: NaiveDate,
        end: NaiveDate,
        collections: &[i64],
        page_token: Option<&str>,
    ) -> Result<SearchPage, PipelineError> {
        let url = format!("{}/search/story-list", self.api_base);

        let mut request = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .query(&[
                ("q", query.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
            ]);

        if !collections.is_empty() {
            let ids = collections
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            request = request.query(&[("collection_ids", ids)]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("pagination_token", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Fetch(format!("request to {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body: StoryListResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Fetch(format!("malformed story-list response: {}", e)))?;

        let records = body.stories.into_iter().map(ApiStory::into_record).collect();
        Ok((records, body.pagination_token))
    }
}
